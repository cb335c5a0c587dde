pub mod dsp;
pub mod pitch;
pub mod matrix;
pub mod feedback;
pub mod teach;
pub mod coordinate;
pub mod sequencer;
pub mod nodes;
pub mod parameters;
pub mod processing;
pub mod persistence;
pub mod config;
pub mod errors;

pub use config::EngineConfig;
pub use coordinate::{AddressMode, ButtonGrid, CoordinateEngine};
pub use feedback::{IndicatorPanel, TeachFeedback};
pub use matrix::{generate, NoteMatrix, TaughtRow, STEPS, UNSET};
pub use nodes::{create_node, MatrixSequencerNode};
pub use parameters::{Parameterizable, ParameterDescriptor, ParameterError};
pub use pitch::PitchCodec;
pub use processing::{AudioNode, InputBuffers, NodeCategory, NodeInfo, OutputBuffers, ProcessContext, ProcessingError};
pub use sequencer::{MatrixSequencer, Switches, TickInput, TickOutput};
pub use teach::{TeachEngine, TeachPhase};
pub use errors::{MatrixError, MatrixResult};
