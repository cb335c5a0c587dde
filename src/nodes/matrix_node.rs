/*
 * SerialMatrix - Twelve-Tone Matrix Sequencer
 * Copyright (c) 2025 MACHIKO LAB
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

use std::collections::HashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::feedback::IndicatorPanel;
use crate::matrix::{TaughtRow, STEPS};
use crate::parameters::{switch_value, BasicParameter, ParameterDescriptor, ParameterError, Parameterizable};
use crate::persistence::{row_from_json, row_to_json};
use crate::processing::{AudioNode, NodeCategory, NodeInfo, PortInfo, PortType, ProcessContext, ProcessingError};
use crate::sequencer::{MatrixSequencer, TickInput};

pub const PITCH_IN: &str = "pitch_in";
pub const TEACH_TRIGGER_IN: &str = "teach_trigger_in";
pub const ROW_CV: &str = "row_cv";
pub const COL_CV: &str = "col_cv";

pub const PITCH_OUT: &str = "pitch_out";
pub const GATE_OUT: &str = "gate_out";
pub const TRIGGER_OUT: &str = "trigger_out";
pub const ROW_TRIGGER_ANY: &str = "row_trigger_any";
pub const COL_TRIGGER_ANY: &str = "col_trigger_any";

pub fn row_trigger_port(row: usize) -> String {
    format!("row_trigger_{}", row)
}

pub fn col_trigger_port(col: usize) -> String {
    format!("col_trigger_{}", col)
}

pub fn button_parameter(row: usize, col: usize) -> String {
    format!("button_{}_{}", row, col)
}

/// `button_<row>_<col>` → `(row, col)`
fn parse_button(name: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix("button_")?;
    let (row, col) = rest.split_once('_')?;
    let row = row.parse::<usize>().ok()?;
    let col = col.parse::<usize>().ok()?;
    (row < STEPS && col < STEPS).then_some((row, col))
}

/// 12音マトリクス・シーケンサー - ティーチ／グリッド／外部CVアドレッシング
pub struct MatrixSequencerNode {
    node_info: NodeInfo,
    sequencer: MatrixSequencer<IndicatorPanel>,

    row_trigger_ports: Vec<String>,
    col_trigger_ports: Vec<String>,
}

impl MatrixSequencerNode {
    pub fn new(name: String, config: &EngineConfig) -> Self {
        let mut output_ports = vec![
            PortInfo::new(PITCH_OUT, PortType::CV)
                .with_description("1V/Oct pitch of the addressed cell (teach mode: pitch input)"),
            PortInfo::new(GATE_OUT, PortType::Gate)
                .with_description("Gate (external mode: low for the length of each trigger)"),
            PortInfo::new(TRIGGER_OUT, PortType::Gate)
                .with_description("Trigger on every new note")
                .optional(),
        ];
        for row in 0..STEPS {
            output_ports.push(
                PortInfo::new(&row_trigger_port(row), PortType::Gate)
                    .with_description(&format!("Trigger when row {} is entered", row))
                    .optional(),
            );
        }
        output_ports.push(
            PortInfo::new(ROW_TRIGGER_ANY, PortType::Gate)
                .with_description("Trigger on any row change")
                .optional(),
        );
        for col in 0..STEPS {
            output_ports.push(
                PortInfo::new(&col_trigger_port(col), PortType::Gate)
                    .with_description(&format!("Trigger when column {} is entered", col))
                    .optional(),
            );
        }
        output_ports.push(
            PortInfo::new(COL_TRIGGER_ANY, PortType::Gate)
                .with_description("Trigger on any column change")
                .optional(),
        );

        let node_info = NodeInfo {
            id: Uuid::new_v4(),
            name,
            node_type: "matrix_sequencer".to_string(),
            category: NodeCategory::Controller,
            description: "Twelve-tone matrix sequencer with row teaching and CV addressing".to_string(),
            input_ports: vec![
                PortInfo::new(PITCH_IN, PortType::CV)
                    .with_description("Pitch to teach (1V/Oct)")
                    .optional(),
                PortInfo::new(TEACH_TRIGGER_IN, PortType::Gate)
                    .with_description("Teach trigger/gate (>1V = note)")
                    .optional(),
                PortInfo::new(ROW_CV, PortType::CV)
                    .with_description("Row address (0V to +10V)")
                    .optional(),
                PortInfo::new(COL_CV, PortType::CV)
                    .with_description("Column address (0V to +10V)")
                    .optional(),
            ],
            output_ports,
            latency_samples: 0,
        };

        Self {
            node_info,
            sequencer: MatrixSequencer::new(config),
            row_trigger_ports: (0..STEPS).map(row_trigger_port).collect(),
            col_trigger_ports: (0..STEPS).map(col_trigger_port).collect(),
        }
    }

    pub fn sequencer(&self) -> &MatrixSequencer<IndicatorPanel> {
        &self.sequencer
    }

    /// Status line shown while teaching
    pub fn status(&self) -> &str {
        self.sequencer.feedback().status()
    }

    /// Persistent state: the taught row as a flat array
    pub fn save_state(&self) -> Value {
        row_to_json(self.sequencer.taught_row())
    }

    pub fn load_state(&mut self, state: &Value) {
        self.restore_row(row_from_json(state));
    }

    /// Install a row (leaves teach mode and regenerates the matrix)
    pub fn restore_row(&mut self, row: TaughtRow) {
        self.sequencer.restore_row(row);
    }
}

impl Parameterizable for MatrixSequencerNode {
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), ParameterError> {
        if let Some((row, col)) = parse_button(name) {
            let value = BasicParameter::switch(name, name).validate(value)?;
            self.sequencer.buttons_mut().set(row, col, value > 0.5);
            return Ok(());
        }

        match name {
            "teach_index" | "reference_voltage" => {
                return Err(ParameterError::ReadOnly { name: name.to_string() });
            }
            _ => {}
        }

        let descriptor = self
            .get_parameter_descriptors()
            .into_iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| ParameterError::NotFound { name: name.to_string() })?;
        let on = descriptor.validate(value)? > 0.5;

        let switches = self.sequencer.switches_mut();
        match name {
            "teach_mode" => switches.teach_mode = on,
            "allow_repetition" => switches.allow_repetition = on,
            "single_octave" => switches.single_octave = on,
            "use_external" => switches.use_external = on,
            _ => return Err(ParameterError::NotFound { name: name.to_string() }),
        }
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32, ParameterError> {
        if let Some((row, col)) = parse_button(name) {
            return Ok(switch_value(self.sequencer.buttons().get(row, col)));
        }

        let switches = self.sequencer.switches();
        match name {
            "teach_mode" => Ok(switch_value(switches.teach_mode)),
            "allow_repetition" => Ok(switch_value(switches.allow_repetition)),
            "single_octave" => Ok(switch_value(switches.single_octave)),
            "use_external" => Ok(switch_value(switches.use_external)),
            "teach_index" => Ok(self.sequencer.teach_index() as f32),
            "reference_voltage" => Ok(self.sequencer.reference_voltage()),
            _ => Err(ParameterError::NotFound { name: name.to_string() }),
        }
    }

    fn get_all_parameters(&self) -> HashMap<String, f32> {
        let mut params = HashMap::new();
        for name in ["teach_mode", "allow_repetition", "single_octave", "use_external", "teach_index", "reference_voltage"] {
            if let Ok(value) = self.get_parameter(name) {
                params.insert(name.to_string(), value);
            }
        }

        for row in 0..STEPS {
            for col in 0..STEPS {
                params.insert(
                    button_parameter(row, col),
                    switch_value(self.sequencer.buttons().get(row, col)),
                );
            }
        }

        params
    }

    fn get_parameter_descriptors(&self) -> Vec<Box<dyn ParameterDescriptor>> {
        vec![
            Box::new(BasicParameter::switch("teach_mode", "Teach Mode")),
            Box::new(BasicParameter::switch("allow_repetition", "Allow Rep")),
            Box::new(BasicParameter::switch("single_octave", "Single Octave")),
            Box::new(BasicParameter::switch("use_external", "Ext Mode")),
        ]
    }
}

impl AudioNode for MatrixSequencerNode {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError> {
        let buffer_size = ctx
            .outputs
            .get_cv(PITCH_OUT)
            .ok_or_else(|| ProcessingError::OutputBufferError {
                port_name: PITCH_OUT.to_string(),
            })?
            .len();
        let delta_time = ctx.delta_time();

        for i in 0..buffer_size {
            let input = TickInput {
                pitch: ctx.inputs.cv_at(PITCH_IN, i),
                teach_trigger: ctx.inputs.cv_at(TEACH_TRIGGER_IN, i),
                row_cv: ctx.inputs.cv_at(ROW_CV, i),
                col_cv: ctx.inputs.cv_at(COL_CV, i),
            };
            let output = self.sequencer.tick(&input, delta_time);

            let outputs = &mut ctx.outputs;
            outputs.write_cv(PITCH_OUT, i, output.pitch);
            outputs.write_cv(GATE_OUT, i, output.gate);
            outputs.write_cv(TRIGGER_OUT, i, output.trigger);
            for (port, &voltage) in self.row_trigger_ports.iter().zip(output.row_triggers.iter()) {
                outputs.write_cv(port, i, voltage);
            }
            outputs.write_cv(ROW_TRIGGER_ANY, i, output.row_any);
            for (port, &voltage) in self.col_trigger_ports.iter().zip(output.col_triggers.iter()) {
                outputs.write_cv(port, i, voltage);
            }
            outputs.write_cv(COL_TRIGGER_ANY, i, output.col_any);
        }

        ctx.timestamp += buffer_size as u64;
        Ok(())
    }

    fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    fn reset(&mut self) {
        self.sequencer.reset();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> MatrixSequencerNode {
        MatrixSequencerNode::new("test".to_string(), &EngineConfig::default())
    }

    #[test]
    fn test_port_layout() {
        let node = node();
        let info = node.node_info();
        assert_eq!(info.input_ports.len(), 4);
        // pitch, gate, trigger, 13 row and 13 column triggers
        assert_eq!(info.output_ports.len(), 29);
        assert!(info.output_ports.iter().any(|p| p.name == "row_trigger_11"));
        assert!(info.output_ports.iter().any(|p| p.name == "col_trigger_any"));
        assert_eq!(info.category, NodeCategory::Controller);
    }

    #[test]
    fn test_switch_parameters() {
        let mut node = node();
        assert!(node.set_parameter("use_external", 1.0).is_ok());
        assert_eq!(node.get_parameter("use_external").unwrap(), 1.0);
        assert!(node.sequencer().switches().use_external);

        assert!(matches!(
            node.set_parameter("single_octave", 2.0),
            Err(ParameterError::OutOfRange { .. })
        ));
        assert!(matches!(
            node.set_parameter("nonexistent", 1.0),
            Err(ParameterError::NotFound { .. })
        ));
        assert!(matches!(
            node.set_parameter("teach_index", 3.0),
            Err(ParameterError::ReadOnly { .. })
        ));
        assert_eq!(node.get_parameter("reference_voltage").unwrap(), 1.0);
    }

    #[test]
    fn test_button_parameters() {
        let mut node = node();
        assert!(node.set_parameter("button_4_11", 1.0).is_ok());
        assert_eq!(node.get_parameter("button_4_11").unwrap(), 1.0);
        assert!(node.sequencer().buttons().get(4, 11));

        assert!(node.set_parameter("button_12_0", 1.0).is_err());
        assert!(node.set_parameter("button_4", 1.0).is_err());
        assert!(node.get_parameter("button_x_1").is_err());

        let all = node.get_all_parameters();
        assert_eq!(all.len(), 6 + 144);
        assert_eq!(all["button_4_11"], 1.0);
    }

    #[test]
    fn test_state_round_trip() {
        let mut node = node();
        node.load_state(&json!([0, 11, 7, 8, 3, 1, 2, 10, 6, 5, 4, 9]));
        assert_eq!(node.save_state(), json!([0, 11, 7, 8, 3, 1, 2, 10, 6, 5, 4, 9]));
        assert_eq!(
            *node.sequencer().taught_row(),
            TaughtRow::new([0, 11, 7, 8, 3, 1, 2, 10, 6, 5, 4, 9])
        );
        assert_eq!(node.sequencer().matrix().get(2, 0), 5);
    }

    #[test]
    fn test_missing_output_buffer() {
        let mut node = node();
        let mut ctx = ProcessContext::new(
            crate::processing::InputBuffers::new(),
            crate::processing::OutputBuffers::new(),
            44100.0,
            64,
        );
        assert_eq!(
            node.process(&mut ctx),
            Err(ProcessingError::OutputBufferError { port_name: PITCH_OUT.to_string() })
        );
    }
}
