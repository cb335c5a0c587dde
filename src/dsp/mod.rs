pub mod edge;
pub mod pulse;

pub use edge::EdgeDetector;
pub use pulse::{BankLevels, PulseGenerator, TriggerBank};
