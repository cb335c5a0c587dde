pub mod matrix_node;

pub use matrix_node::MatrixSequencerNode;

use crate::config::EngineConfig;
use crate::processing::AudioNode;

pub fn create_node(node_type: &str, name: String, config: &EngineConfig) -> Result<Box<dyn AudioNode>, String> {
    match node_type {
        "matrix_sequencer" => Ok(Box::new(MatrixSequencerNode::new(name, config))),
        _ => Err(format!("Unknown node type: {}", node_type)),
    }
}
