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

//! Row capture from a live pitch + trigger stream.

use tracing::{debug, warn};

use crate::dsp::EdgeDetector;
use crate::feedback::TeachFeedback;
use crate::matrix::{TaughtRow, STEPS};
use crate::pitch::PitchCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeachPhase {
    Idle,
    /// Waiting for the note at `index`
    Capturing { index: usize },
    /// Teach mode has ended; the gate keeps following the trigger input
    /// until it is released
    AwaitingGateRelease,
}

/// Per-sample input while teaching
#[derive(Debug, Clone, Copy, Default)]
pub struct TeachInput {
    pub pitch: f32,
    pub trigger: f32,
    pub allow_repetition: bool,
}

/// Per-sample result of the teach engine
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeachOutput {
    /// Mirrors the pitch input
    pub pitch: f32,
    /// Mirrors the trigger input unless the gate mask is down
    pub gate: f32,
    /// Request a pulse on the main trigger output
    pub fire_trigger: bool,
    /// The twelfth note was accepted on this sample
    pub row_complete: bool,
    /// The session is over and the gate was released; the matrix must be rebuilt
    pub released: bool,
}

#[derive(Debug, Clone)]
pub struct TeachEngine {
    phase: TeachPhase,
    row: TaughtRow,
    // Row in effect before the current session, restored on an aborted session
    previous_row: TaughtRow,
    first_note_pending: bool,
    gate_mask: bool,
    trigger_edge: EdgeDetector,
}

impl Default for TeachEngine {
    fn default() -> Self {
        Self::new(EdgeDetector::default())
    }
}

impl TeachEngine {
    pub fn new(trigger_edge: EdgeDetector) -> Self {
        Self {
            phase: TeachPhase::Idle,
            row: TaughtRow::default(),
            previous_row: TaughtRow::default(),
            first_note_pending: true,
            gate_mask: true,
            trigger_edge,
        }
    }

    pub fn phase(&self) -> TeachPhase {
        self.phase
    }

    pub fn row(&self) -> &TaughtRow {
        &self.row
    }

    /// Index of the next slot to be taught (0 outside a session)
    pub fn teach_index(&self) -> usize {
        match self.phase {
            TeachPhase::Capturing { index } => index,
            _ => 0,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.phase, TeachPhase::Capturing { .. })
    }

    pub fn is_idle(&self) -> bool {
        self.phase == TeachPhase::Idle
    }

    /// Replace the row outside of a session (restore from persistence)
    pub fn restore(&mut self, row: TaughtRow, feedback: &mut dyn TeachFeedback) {
        self.row = row;
        self.previous_row = row;
        self.phase = TeachPhase::Idle;
        feedback.set_status(&self.row.to_string());
    }

    /// Enter teach mode: blank the row and start at slot 0.
    pub fn begin(&mut self, feedback: &mut dyn TeachFeedback) {
        if !self.is_capturing() {
            self.previous_row = self.row;
        }
        self.row = TaughtRow::unset();
        self.phase = TeachPhase::Capturing { index: 0 };
        self.first_note_pending = true;
        self.gate_mask = true;

        feedback.clear_lights();
        feedback.set_light(0, true);
        feedback.set_status(&self.row.to_string());
        debug!("teach mode entered");
    }

    /// Teach mode switched off by the user. An incomplete row is discarded
    /// in favour of the row that was in effect before the session.
    pub fn end(&mut self, feedback: &mut dyn TeachFeedback) {
        if !self.is_capturing() {
            return;
        }

        if !self.row.is_complete() {
            warn!(
                "teach mode left with an incomplete row [{}], keeping [{}]",
                self.row, self.previous_row
            );
            self.row = self.previous_row;
            feedback.set_status(&self.row.to_string());
        }
        feedback.fill_lights();
        self.phase = TeachPhase::AwaitingGateRelease;
    }

    /// Process one sample of teach input. Must only be called while
    /// capturing or awaiting the gate release.
    pub fn process(
        &mut self,
        input: TeachInput,
        codec: &mut PitchCodec,
        feedback: &mut dyn TeachFeedback,
    ) -> TeachOutput {
        let triggered = self.trigger_edge.process(input.trigger);
        let mut output = TeachOutput {
            pitch: input.pitch,
            ..TeachOutput::default()
        };

        match self.phase {
            TeachPhase::Idle => {}
            TeachPhase::Capturing { index } => {
                if triggered {
                    self.capture(index, input, codec, feedback, &mut output);
                }
                output.gate = if self.gate_mask { input.trigger } else { 0.0 };
            }
            TeachPhase::AwaitingGateRelease => {
                if self.trigger_edge.is_high() {
                    output.gate = input.trigger;
                } else {
                    self.phase = TeachPhase::Idle;
                    self.gate_mask = true;
                    output.released = true;
                    debug!("gate released, teach session closed with row [{}]", self.row);
                }
            }
        }

        output
    }

    fn capture(
        &mut self,
        index: usize,
        input: TeachInput,
        codec: &mut PitchCodec,
        feedback: &mut dyn TeachFeedback,
        output: &mut TeachOutput,
    ) {
        if !input.pitch.is_finite() {
            self.gate_mask = false;
            return;
        }

        let offset = if self.first_note_pending {
            codec.set_reference(input.pitch);
            output.fire_trigger = true;
            0
        } else {
            codec.volt_to_note(input.pitch)
        };

        // Strict mode only sounds notes that make it into the row
        if !input.allow_repetition {
            self.gate_mask = false;
        }

        if offset < 0 {
            self.gate_mask = false;
            return;
        }

        if !input.allow_repetition && self.row.contains_pitch_class(offset) {
            return;
        }

        self.first_note_pending = false;
        self.gate_mask = true;
        self.row.set(index, offset);
        debug!("taught note {} at position {}", offset, index);

        feedback.set_light(index, false);
        feedback.set_status(&self.row.to_string());

        if index + 1 < STEPS {
            feedback.set_light(index + 1, true);
            self.phase = TeachPhase::Capturing { index: index + 1 };
        } else {
            feedback.fill_lights();
            output.row_complete = true;
            self.phase = TeachPhase::AwaitingGateRelease;
            debug!("row complete: [{}]", self.row);
        }
    }

    /// Drop any session in progress. An unfinished row is rolled back.
    pub fn reset(&mut self, feedback: &mut dyn TeachFeedback) {
        if self.is_capturing() && !self.row.is_complete() {
            self.row = self.previous_row;
        }
        if !self.is_idle() {
            feedback.fill_lights();
            feedback.set_status(&self.row.to_string());
        }
        self.phase = TeachPhase::Idle;
        self.first_note_pending = true;
        self.gate_mask = true;
        self.trigger_edge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::IndicatorPanel;
    use crate::pitch::SEMITONE_VOLTS;

    struct Rig {
        engine: TeachEngine,
        codec: PitchCodec,
        panel: IndicatorPanel,
        allow_repetition: bool,
    }

    impl Rig {
        fn new(allow_repetition: bool) -> Self {
            let mut rig = Self {
                engine: TeachEngine::default(),
                codec: PitchCodec::new(0.0),
                panel: IndicatorPanel::new(),
                allow_repetition,
            };
            rig.engine.begin(&mut rig.panel);
            rig
        }

        fn tick(&mut self, pitch: f32, trigger: f32) -> TeachOutput {
            let input = TeachInput {
                pitch,
                trigger,
                allow_repetition: self.allow_repetition,
            };
            self.engine.process(input, &mut self.codec, &mut self.panel)
        }

        /// Press and release a key; returns the output of the press sample
        fn strike(&mut self, pitch: f32) -> TeachOutput {
            let pressed = self.tick(pitch, 10.0);
            if self.engine.is_capturing() {
                self.tick(pitch, 0.0);
            }
            pressed
        }
    }

    #[test]
    fn test_begin_blanks_row_and_panel() {
        let rig = Rig::new(false);
        assert_eq!(rig.engine.phase(), TeachPhase::Capturing { index: 0 });
        assert_eq!(*rig.engine.row(), TaughtRow::unset());
        assert_eq!(rig.panel.status(), "- - - - - - - - - - - -");
        assert!(rig.panel.light(0));
        assert_eq!(rig.panel.lights().iter().filter(|&&on| on).count(), 1);
    }

    #[test]
    fn test_first_note_defines_reference() {
        let mut rig = Rig::new(false);
        let out = rig.strike(3.3);
        assert!(out.fire_trigger);
        assert_eq!(rig.engine.row().get(0), 0);
        assert!((rig.codec.reference_voltage() - 3.3).abs() < 1e-6);
        assert_eq!(rig.engine.teach_index(), 1);
        assert!(rig.panel.light(1));
        assert!(!rig.panel.light(0));
    }

    #[test]
    fn test_ascending_semitones_complete_row() {
        let mut rig = Rig::new(false);
        let mut last = TeachOutput::default();
        for step in 0..12 {
            last = rig.strike(1.0 + step as f32 * SEMITONE_VOLTS);
        }

        assert!(last.row_complete);
        assert_eq!(rig.engine.row().offsets(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(rig.engine.phase(), TeachPhase::AwaitingGateRelease);
        assert!(rig.panel.lights().iter().all(|&on| on));
        assert_eq!(rig.panel.status(), "0 1 2 3 4 5 6 7 8 9 10 11");

        // Key still held: the gate keeps following the trigger input
        let held = rig.tick(1.0 + 11.0 * SEMITONE_VOLTS, 10.0);
        assert_eq!(held.gate, 10.0);
        assert!(!held.released);

        let released = rig.tick(1.0, 0.0);
        assert!(released.released);
        assert_eq!(released.gate, 0.0);
        assert!(rig.engine.is_idle());
    }

    #[test]
    fn test_strict_mode_rejects_repeated_pitch_class() {
        let mut rig = Rig::new(false);
        rig.strike(1.0);
        rig.strike(1.0 + 2.0 * SEMITONE_VOLTS);

        // Same pitch class an octave up is still a repeat
        let out = rig.tick(1.0 + 14.0 * SEMITONE_VOLTS, 10.0);
        assert_eq!(out.gate, 0.0, "rejected notes stay silent in strict mode");
        assert_eq!(rig.engine.teach_index(), 2);
        rig.tick(1.0, 0.0);

        let out = rig.tick(1.0 + 4.0 * SEMITONE_VOLTS, 10.0);
        assert_eq!(out.gate, 10.0);
        assert_eq!(rig.engine.row().get(2), 4);
    }

    #[test]
    fn test_repetition_allowed() {
        let mut rig = Rig::new(true);
        rig.strike(2.0);
        let out = rig.strike(2.0);
        assert_eq!(out.gate, 10.0);
        assert_eq!(rig.engine.row().get(1), 0);
        assert_eq!(rig.engine.teach_index(), 2);
    }

    #[test]
    fn test_notes_below_reference_are_ignored() {
        let mut rig = Rig::new(true);
        rig.strike(2.0);
        let out = rig.tick(2.0 - 3.0 * SEMITONE_VOLTS, 10.0);
        assert_eq!(out.gate, 0.0);
        assert_eq!(rig.engine.teach_index(), 1);
        assert_eq!(rig.engine.row().get(1), crate::matrix::UNSET);
    }

    #[test]
    fn test_pitch_passes_through() {
        let mut rig = Rig::new(false);
        let out = rig.tick(4.2, 0.0);
        assert_eq!(out.pitch, 4.2);
        assert_eq!(out.gate, 0.0);
    }

    #[test]
    fn test_held_trigger_counts_once() {
        let mut rig = Rig::new(true);
        for _ in 0..100 {
            rig.tick(1.0, 10.0);
        }
        assert_eq!(rig.engine.teach_index(), 1);
    }

    #[test]
    fn test_incomplete_session_restores_previous_row() {
        let mut rig = Rig::new(false);
        rig.strike(1.0);
        rig.strike(1.5);
        rig.engine.end(&mut rig.panel);

        assert_eq!(*rig.engine.row(), TaughtRow::chromatic());
        assert_eq!(rig.engine.phase(), TeachPhase::AwaitingGateRelease);
        assert!(rig.tick(1.0, 0.0).released);
    }

    #[test]
    fn test_non_finite_pitch_is_rejected() {
        let mut rig = Rig::new(true);
        let out = rig.strike(f32::NAN);
        assert!(!out.fire_trigger);
        assert_eq!(out.gate, 0.0);
        assert_eq!(rig.engine.teach_index(), 0);

        rig.strike(2.0);
        assert!(rig.engine.row().get(1) == crate::matrix::UNSET);
        let out = rig.tick(f32::INFINITY, 10.0);
        assert_eq!(out.gate, 0.0);
        assert_eq!(rig.engine.teach_index(), 1);
        assert!((rig.codec.reference_voltage() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_mid_session_refreshes_panel() {
        let mut rig = Rig::new(false);
        rig.strike(1.0);
        rig.strike(1.25);
        assert_eq!(rig.panel.status(), "0 3 - - - - - - - - - -");

        rig.engine.reset(&mut rig.panel);
        assert!(rig.engine.is_idle());
        assert_eq!(*rig.engine.row(), TaughtRow::chromatic());
        assert_eq!(rig.panel.status(), "0 1 2 3 4 5 6 7 8 9 10 11");
        assert!(rig.panel.lights().iter().all(|&on| on));
    }

    #[test]
    fn test_index_wraps_after_full_row() {
        let mut rig = Rig::new(true);
        for _ in 0..12 {
            rig.strike(1.0);
        }
        assert_eq!(rig.engine.phase(), TeachPhase::AwaitingGateRelease);
        assert_eq!(rig.engine.teach_index(), 0);
    }
}
