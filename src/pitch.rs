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

//! 1V/Oct pitch codec relative to a learned reference voltage.

use crate::matrix::UNSET;

/// One semitone in 1V/Oct
pub const SEMITONE_VOLTS: f32 = 1.0 / 12.0;

/// Converts between pitch CV and semitone offsets from a reference voltage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCodec {
    reference_voltage: f32,
}

impl PitchCodec {
    pub fn new(reference_voltage: f32) -> Self {
        Self { reference_voltage }
    }

    pub fn reference_voltage(&self) -> f32 {
        self.reference_voltage
    }

    /// Learn a new zero point (the first note of a teach session)
    pub fn set_reference(&mut self, voltage: f32) {
        self.reference_voltage = voltage;
    }

    /// Nearest semitone offset of `voltage` from the reference. May be negative.
    /// A non-finite voltage reads as `UNSET`.
    pub fn volt_to_note(&self, voltage: f32) -> i32 {
        let offset = ((voltage - self.reference_voltage) / SEMITONE_VOLTS).round();
        if offset.is_finite() { offset as i32 } else { UNSET }
    }

    /// Pitch CV for `offset`. The unset sentinel maps to 0V.
    pub fn note_to_volt(&self, offset: i32) -> f32 {
        if offset == UNSET {
            return 0.0;
        }
        offset as f32 * SEMITONE_VOLTS + self.reference_voltage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_offset_zero() {
        for reference in [-3.0, 0.0, 1.0, 2.37] {
            let codec = PitchCodec::new(reference);
            assert_eq!(codec.volt_to_note(reference), 0);
            assert!((codec.note_to_volt(0) - reference).abs() < 1e-6);
        }
    }

    #[test]
    fn test_semitone_rounding() {
        let codec = PitchCodec::new(1.0);
        assert_eq!(codec.volt_to_note(1.0 + 7.0 / 12.0), 7);
        // Slightly flat/sharp keys still land on the nearest step
        assert_eq!(codec.volt_to_note(1.0 + 7.0 / 12.0 - 0.03), 7);
        assert_eq!(codec.volt_to_note(1.0 + 7.0 / 12.0 + 0.03), 7);
        assert_eq!(codec.volt_to_note(2.0), 12);
        assert_eq!(codec.volt_to_note(0.5), -6);
    }

    #[test]
    fn test_non_finite_voltage_is_unset() {
        let codec = PitchCodec::new(1.0);
        assert_eq!(codec.volt_to_note(f32::NAN), UNSET);
        assert_eq!(codec.volt_to_note(f32::INFINITY), UNSET);
        assert_eq!(PitchCodec::new(f32::NAN).volt_to_note(1.0), UNSET);
    }

    #[test]
    fn test_note_to_volt() {
        let codec = PitchCodec::new(1.0);
        assert!((codec.note_to_volt(12) - 2.0).abs() < 1e-6);
        assert!((codec.note_to_volt(3) - 1.25).abs() < 1e-6);
        assert_eq!(codec.note_to_volt(UNSET), 0.0);
    }
}
