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

//! One instrument instance: teach engine, matrix and addressing, run one
//! sample at a time.

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::coordinate::{AddressMode, ButtonGrid, CoordinateEngine, CoordinateInput, TriggerLevels, TriggerOutputs};
use crate::dsp::{BankLevels, EdgeDetector};
use crate::feedback::{IndicatorPanel, TeachFeedback};
use crate::matrix::{generate, NoteMatrix, TaughtRow, STEPS};
use crate::pitch::PitchCodec;
use crate::teach::{TeachEngine, TeachInput, TeachPhase};

/// Front panel switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Switches {
    pub teach_mode: bool,
    pub allow_repetition: bool,
    pub single_octave: bool,
    pub use_external: bool,
}

/// Input voltages for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub pitch: f32,
    pub teach_trigger: f32,
    pub row_cv: f32,
    pub col_cv: f32,
}

/// Output voltages for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutput {
    pub pitch: f32,
    pub gate: f32,
    pub trigger: f32,
    pub row_triggers: [f32; STEPS],
    pub row_any: f32,
    pub col_triggers: [f32; STEPS],
    pub col_any: f32,
}

pub struct MatrixSequencer<F: TeachFeedback = IndicatorPanel> {
    gate_voltage: f32,
    trigger_voltage: f32,
    trigger_duration: f32,
    default_reference_voltage: f32,

    switches: Switches,
    buttons: ButtonGrid,

    teach: TeachEngine,
    codec: PitchCodec,
    matrix: NoteMatrix,
    // Octave flag the current matrix was generated with
    matrix_single_octave: bool,

    coordinates: CoordinateEngine,
    triggers: TriggerOutputs,
    feedback: F,
}

impl MatrixSequencer<IndicatorPanel> {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_feedback(config, IndicatorPanel::new())
    }
}

impl<F: TeachFeedback> MatrixSequencer<F> {
    pub fn with_feedback(config: &EngineConfig, feedback: F) -> Self {
        let edge = EdgeDetector::new(config.edge_high_threshold, config.edge_low_threshold);
        let teach = TeachEngine::new(edge);
        let matrix = generate(teach.row(), false);

        Self {
            gate_voltage: config.gate_voltage,
            trigger_voltage: config.trigger_voltage,
            trigger_duration: config.trigger_duration,
            default_reference_voltage: config.default_reference_voltage,

            switches: Switches::default(),
            buttons: ButtonGrid::new(),

            teach,
            codec: PitchCodec::new(config.default_reference_voltage),
            matrix,
            matrix_single_octave: false,

            coordinates: CoordinateEngine::new(config.trigger_duration, config.external_scale()),
            triggers: TriggerOutputs::default(),
            feedback,
        }
    }

    pub fn switches(&self) -> Switches {
        self.switches
    }

    pub fn switches_mut(&mut self) -> &mut Switches {
        &mut self.switches
    }

    pub fn buttons(&self) -> &ButtonGrid {
        &self.buttons
    }

    pub fn buttons_mut(&mut self) -> &mut ButtonGrid {
        &mut self.buttons
    }

    pub fn taught_row(&self) -> &TaughtRow {
        self.teach.row()
    }

    pub fn matrix(&self) -> &NoteMatrix {
        &self.matrix
    }

    pub fn teach_phase(&self) -> TeachPhase {
        self.teach.phase()
    }

    pub fn teach_index(&self) -> usize {
        self.teach.teach_index()
    }

    pub fn reference_voltage(&self) -> f32 {
        self.codec.reference_voltage()
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn address_mode(&self) -> AddressMode {
        if self.switches.use_external {
            AddressMode::External
        } else {
            AddressMode::Grid
        }
    }

    /// Load a stored row. Leaves teach mode, resets the reference voltage
    /// and rebuilds the matrix.
    pub fn restore_row(&mut self, row: TaughtRow) {
        self.switches.teach_mode = false;
        self.teach.restore(row, &mut self.feedback);
        self.codec.set_reference(self.default_reference_voltage);
        self.regenerate_matrix();
    }

    fn regenerate_matrix(&mut self) {
        self.matrix = generate(self.teach.row(), self.switches.single_octave);
        self.matrix_single_octave = self.switches.single_octave;

        debug!(
            "matrix regenerated from [{}] (single octave: {})",
            self.teach.row(),
            self.matrix_single_octave
        );
        for (r, row) in self.matrix.rows().iter().enumerate() {
            trace!("{:2} | {:?}", r, row);
        }
    }

    /// Run one sample. `delta_time` is the sample period in seconds.
    pub fn tick(&mut self, input: &TickInput, delta_time: f32) -> TickOutput {
        let teaching = match self.teach.phase() {
            TeachPhase::Idle => {
                if self.switches.teach_mode {
                    self.teach.begin(&mut self.feedback);
                    true
                } else {
                    false
                }
            }
            TeachPhase::Capturing { .. } => {
                if !self.switches.teach_mode {
                    self.teach.end(&mut self.feedback);
                }
                true
            }
            TeachPhase::AwaitingGateRelease => true,
        };

        let mut teach_voltages = None;
        if teaching {
            let teach_input = TeachInput {
                pitch: input.pitch,
                trigger: input.teach_trigger,
                allow_repetition: self.switches.allow_repetition,
            };
            let result = self.teach.process(teach_input, &mut self.codec, &mut self.feedback);

            if result.fire_trigger {
                self.triggers.main.trigger(self.trigger_duration);
            }
            if result.row_complete {
                self.switches.teach_mode = false;
            }

            if result.released {
                self.regenerate_matrix();
            } else {
                teach_voltages = Some((result.pitch, result.gate));
            }
        }

        if teach_voltages.is_none() {
            self.process_playback(input);
        }

        let levels = self.triggers.process(delta_time);
        let (pitch, gate) = match teach_voltages {
            Some(voltages) => voltages,
            None => (self.coordinates.pitch(), self.playback_gate(&levels)),
        };

        self.build_output(pitch, gate, &levels)
    }

    fn process_playback(&mut self, input: &TickInput) {
        if self.matrix_single_octave != self.switches.single_octave {
            self.regenerate_matrix();
        }

        let coordinate_input = CoordinateInput {
            mode: self.address_mode(),
            row_cv: input.row_cv,
            col_cv: input.col_cv,
            matrix: &self.matrix,
            codec: &self.codec,
        };
        self.coordinates
            .process(&coordinate_input, &mut self.buttons, &mut self.triggers);
    }

    fn playback_gate(&self, levels: &TriggerLevels) -> f32 {
        let high = match self.address_mode() {
            AddressMode::Grid => self.coordinates.grid_gate(),
            // Gate drops for the length of each trigger to mark note boundaries
            AddressMode::External => !levels.main,
        };
        if high { self.gate_voltage } else { 0.0 }
    }

    fn build_output(&self, pitch: f32, gate: f32, levels: &TriggerLevels) -> TickOutput {
        let level = |high: bool| if high { self.trigger_voltage } else { 0.0 };
        let bank = |bank: &BankLevels| {
            let mut voltages = [0.0; STEPS];
            for (voltage, &high) in voltages.iter_mut().zip(bank.channels.iter()) {
                *voltage = level(high);
            }
            voltages
        };

        TickOutput {
            pitch,
            gate,
            trigger: level(levels.main),
            row_triggers: bank(&levels.rows),
            row_any: level(levels.rows.any),
            col_triggers: bank(&levels.cols),
            col_any: level(levels.cols.any),
        }
    }

    /// Clear transient state. The taught row and the matrix survive.
    pub fn reset(&mut self) {
        self.switches.teach_mode = false;
        self.teach.reset(&mut self.feedback);
        self.coordinates.reset();
        self.triggers.reset();
        self.regenerate_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::SEMITONE_VOLTS;

    const DT: f32 = 1.0 / 44100.0;

    fn sequencer() -> MatrixSequencer {
        MatrixSequencer::new(&EngineConfig::default())
    }

    fn run(seq: &mut MatrixSequencer, input: TickInput, samples: usize) -> TickOutput {
        let mut last = TickOutput::default();
        for _ in 0..samples {
            last = seq.tick(&input, DT);
        }
        last
    }

    #[test]
    fn test_power_on_state() {
        let mut seq = sequencer();
        assert_eq!(*seq.taught_row(), TaughtRow::chromatic());
        assert_eq!(*seq.matrix(), generate(&TaughtRow::chromatic(), false));

        let out = seq.tick(&TickInput::default(), DT);
        assert_eq!(out, TickOutput::default());
    }

    #[test]
    fn test_teach_then_play_grid() {
        let mut seq = sequencer();
        seq.switches_mut().teach_mode = true;

        let notes = [0, 2, 4, 5, 7, 9, 11, 1, 3, 6, 8, 10];
        for &note in &notes {
            let pitch = 2.0 + note as f32 * SEMITONE_VOLTS;
            run(&mut seq, TickInput { pitch, teach_trigger: 10.0, ..Default::default() }, 4);
            run(&mut seq, TickInput { pitch, teach_trigger: 0.0, ..Default::default() }, 4);
        }

        assert_eq!(seq.taught_row().offsets(), &notes);
        assert!(!seq.switches().teach_mode);
        assert_eq!(seq.teach_phase(), TeachPhase::Idle);
        assert!((seq.reference_voltage() - 2.0).abs() < 1e-6);
        assert_eq!(seq.matrix().get(1, 0), 10);

        seq.buttons_mut().set(0, 1, true);
        let out = seq.tick(&TickInput::default(), DT);
        assert!((out.pitch - (2.0 + 2.0 * SEMITONE_VOLTS)).abs() < 1e-5);
        assert_eq!(out.gate, 10.0);
        assert_eq!(out.trigger, 10.0);
        assert_eq!(out.row_triggers[0], 10.0);
        assert_eq!(out.col_triggers[1], 10.0);
        assert_eq!(out.row_any, 10.0);
        assert_eq!(out.col_any, 10.0);
    }

    #[test]
    fn test_teach_passthrough() {
        let mut seq = sequencer();
        seq.switches_mut().teach_mode = true;
        let out = seq.tick(&TickInput { pitch: 3.0, teach_trigger: 10.0, ..Default::default() }, DT);
        assert_eq!(out.pitch, 3.0);
        assert_eq!(out.gate, 10.0);
        assert_eq!(out.trigger, 10.0, "first note fires a pulse");
    }

    #[test]
    fn test_external_gate_blips() {
        let mut seq = sequencer();
        seq.switches_mut().use_external = true;

        let first = seq.tick(&TickInput { row_cv: 3.0, col_cv: 3.0, ..Default::default() }, DT);
        assert_eq!(first.gate, 0.0);
        assert_eq!(first.trigger, 10.0);

        let settled = run(&mut seq, TickInput { row_cv: 3.0, col_cv: 3.0, ..Default::default() }, 200);
        assert_eq!(settled.gate, 10.0);
        assert_eq!(settled.trigger, 0.0);
        assert!(seq.buttons().get(3, 3));
    }

    #[test]
    fn test_single_octave_toggle_regenerates() {
        let mut seq = sequencer();
        seq.restore_row(TaughtRow::new([0, 2, 4, 5, 7, 9, 11, 1, 3, 6, 8, 10]));
        assert_eq!(seq.matrix().get(1, 6), 21);

        seq.switches_mut().single_octave = true;
        seq.tick(&TickInput::default(), DT);
        assert_eq!(seq.matrix().get(1, 6), 9);
    }

    #[test]
    fn test_restore_leaves_teach_mode() {
        let mut seq = sequencer();
        seq.switches_mut().teach_mode = true;
        seq.tick(&TickInput::default(), DT);
        assert!(matches!(seq.teach_phase(), TeachPhase::Capturing { .. }));

        let row = TaughtRow::new([0, 11, 7, 8, 3, 1, 2, 10, 6, 5, 4, 9]);
        seq.restore_row(row);
        assert!(!seq.switches().teach_mode);
        assert_eq!(seq.teach_phase(), TeachPhase::Idle);
        assert_eq!(seq.reference_voltage(), 1.0);
        assert_eq!(*seq.matrix(), generate(&row, false));
        assert_eq!(seq.feedback().status(), "0 11 7 8 3 1 2 10 6 5 4 9");
    }

    #[test]
    fn test_aborted_teach_keeps_matrix_source() {
        let mut seq = sequencer();
        seq.switches_mut().teach_mode = true;
        run(&mut seq, TickInput { pitch: 1.0, teach_trigger: 10.0, ..Default::default() }, 2);
        run(&mut seq, TickInput { pitch: 1.0, teach_trigger: 0.0, ..Default::default() }, 2);

        seq.switches_mut().teach_mode = false;
        run(&mut seq, TickInput::default(), 2);

        assert_eq!(seq.teach_phase(), TeachPhase::Idle);
        assert_eq!(*seq.taught_row(), TaughtRow::chromatic());
        assert_eq!(*seq.matrix(), generate(&TaughtRow::chromatic(), false));
    }

    #[test]
    fn test_manual_exit_with_key_held() {
        let mut seq = sequencer();
        seq.switches_mut().teach_mode = true;
        run(&mut seq, TickInput { pitch: 1.0, teach_trigger: 10.0, ..Default::default() }, 2);
        run(&mut seq, TickInput { pitch: 1.0, teach_trigger: 0.0, ..Default::default() }, 2);

        let held = TickInput { pitch: 1.25, teach_trigger: 10.0, ..Default::default() };
        run(&mut seq, held, 2);
        seq.switches_mut().teach_mode = false;

        // Gate follows the key until it is released
        let out = run(&mut seq, held, 20);
        assert_eq!(seq.teach_phase(), TeachPhase::AwaitingGateRelease);
        assert_eq!(out.gate, 10.0);
        assert_eq!(*seq.taught_row(), TaughtRow::chromatic());

        let out = seq.tick(&TickInput::default(), DT);
        assert_eq!(seq.teach_phase(), TeachPhase::Idle);
        assert_eq!(out.gate, 0.0);
    }

    #[test]
    fn test_modes_keep_their_own_history() {
        let mut seq = sequencer();
        let cell = TickInput { row_cv: 3.0, col_cv: 3.0, ..Default::default() };

        seq.switches_mut().use_external = true;
        run(&mut seq, cell, 200);

        // The mirrored pad is new to grid mode
        seq.switches_mut().use_external = false;
        let out = seq.tick(&cell, DT);
        assert_eq!(out.trigger, 10.0);
        assert_eq!(out.gate, 10.0);
        run(&mut seq, cell, 200);

        seq.switches_mut().use_external = true;
        let out = seq.tick(&cell, DT);
        assert_eq!(out.trigger, 0.0);
        assert_eq!(out.row_any, 0.0);
        assert_eq!(out.gate, 10.0);

        seq.switches_mut().use_external = false;
        let out = seq.tick(&cell, DT);
        assert_eq!(out.trigger, 0.0);
        assert_eq!(out.gate, 10.0);
    }

    #[test]
    fn test_reset_mid_session_leaves_teach_mode() {
        let mut seq = sequencer();
        seq.switches_mut().teach_mode = true;
        run(&mut seq, TickInput { pitch: 1.0, teach_trigger: 10.0, ..Default::default() }, 2);
        assert_eq!(seq.feedback().status(), "0 - - - - - - - - - - -");

        seq.reset();
        assert!(!seq.switches().teach_mode);
        assert_eq!(seq.teach_phase(), TeachPhase::Idle);
        assert_eq!(seq.feedback().status(), "0 1 2 3 4 5 6 7 8 9 10 11");

        run(&mut seq, TickInput::default(), 2);
        assert_eq!(seq.teach_phase(), TeachPhase::Idle);
        assert_eq!(*seq.taught_row(), TaughtRow::chromatic());
    }
}
