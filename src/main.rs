mod cli;

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{parse_volts, Cli, Commands};
use serial_matrix::matrix::{generate, TaughtRow, STEPS};
use serial_matrix::nodes::matrix_node::{PITCH_IN, PITCH_OUT, TEACH_TRIGGER_IN, ROW_CV, COL_CV};
use serial_matrix::parameters::switch_value;
use serial_matrix::persistence::{load_row, parse_row_list, save_row};
use serial_matrix::{
    AudioNode, EngineConfig, InputBuffers, MatrixSequencerNode, OutputBuffers, Parameterizable, ProcessContext,
};
use tracing::Level;

struct Application {
    config: EngineConfig,
    node: MatrixSequencerNode,
}

impl Application {
    fn new(config: EngineConfig) -> Self {
        let node = MatrixSequencerNode::new("serial-matrix".to_string(), &config);
        Self { config, node }
    }

    /// 1バッファ分処理し、出力バッファを返す
    fn run_buffer(&mut self, inputs: InputBuffers) -> anyhow::Result<OutputBuffers> {
        let buffer_size = self.config.buffer_size;
        let mut outputs = OutputBuffers::new();
        for port in &self.node.node_info().output_ports {
            outputs.allocate_cv(&port.name, buffer_size);
        }

        let mut ctx = ProcessContext::new(inputs, outputs, self.config.sample_rate, buffer_size);
        self.node.process(&mut ctx)?;
        Ok(ctx.outputs)
    }

    /// 1音ごとにトリガーHighのバッファとLowのバッファを流す
    fn teach_row(&mut self, volts: &[f32], allow_repetition: bool) -> anyhow::Result<TaughtRow> {
        self.node.set_parameter("allow_repetition", switch_value(allow_repetition))?;
        self.node.set_parameter("teach_mode", 1.0)?;

        for &voltage in volts {
            for trigger in [10.0, 0.0] {
                let mut inputs = InputBuffers::new();
                inputs.add_cv(PITCH_IN, vec![voltage]);
                inputs.add_cv(TEACH_TRIGGER_IN, vec![trigger]);
                self.run_buffer(inputs)?;
            }
        }

        if self.node.get_parameter("teach_mode")? > 0.5 {
            let accepted = self.node.get_parameter("teach_index")? as usize;
            self.node.set_parameter("teach_mode", 0.0)?;
            self.run_buffer(InputBuffers::new())?;
            bail!(
                "Row incomplete: {} of {} notes accepted from {} voltages, kept [{}]",
                accepted,
                STEPS,
                volts.len(),
                self.node.sequencer().taught_row()
            );
        }

        Ok(*self.node.sequencer().taught_row())
    }

    fn handle_command(&mut self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Matrix { row, single_octave } => {
                let row = parse_row_list(&row)?;
                println!("{}", generate(&row, single_octave));
            }

            Commands::Teach { volts, allow_repetition, out } => {
                let volts = parse_volts(&volts).map_err(anyhow::Error::msg)?;
                if volts.is_empty() {
                    bail!("No voltages given");
                }

                let row = self.teach_row(&volts, allow_repetition)?;
                println!("Row:       {}", row);
                println!("Status:    {}", self.node.status());
                println!("Reference: {:.4} V", self.node.sequencer().reference_voltage());

                if let Some(path) = out {
                    save_row(&row, &path)?;
                    println!("Saved row to {}", path.display());
                }
            }

            Commands::Play { row_file, row_cv, col_cv, single_octave } => {
                let row = load_row(&row_file)
                    .with_context(|| format!("Failed to load row from {}", row_file.display()))?;
                self.node.restore_row(row);
                self.node.set_parameter("use_external", 1.0)?;
                self.node.set_parameter("single_octave", switch_value(single_octave))?;

                let mut inputs = InputBuffers::new();
                inputs.add_cv(ROW_CV, vec![row_cv]);
                inputs.add_cv(COL_CV, vec![col_cv]);
                let outputs = self.run_buffer(inputs)?;

                let pitch = outputs
                    .get_cv(PITCH_OUT)
                    .and_then(|buffer| buffer.last().copied())
                    .unwrap_or(0.0);
                println!("Pitch: {:.4} V", pitch);

                let fired: Vec<&str> = self
                    .node
                    .node_info()
                    .output_ports
                    .iter()
                    .filter(|port| port.name.contains("trigger"))
                    .filter(|port| {
                        outputs
                            .get_cv(&port.name)
                            .is_some_and(|buffer| buffer.iter().any(|&v| v > 0.0))
                    })
                    .map(|port| port.name.as_str())
                    .collect();
                if fired.is_empty() {
                    println!("Triggers: none");
                } else {
                    println!("Triggers: {}", fired.join(" "));
                }
            }
        }

        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    if let Some(path) = path {
        return EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    match EngineConfig::default_path() {
        Some(path) if path.exists() => EngineConfig::load_from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        _ => Ok(EngineConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(cli.config.as_deref())?;
    let mut app = Application::new(config);
    app.handle_command(cli.command)
}
