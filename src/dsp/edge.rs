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

/// Schmitt-style rising edge detector for gate/trigger CVs.
///
/// Fires once when the input reaches `high_threshold` and re-arms only after
/// the input has dropped to `low_threshold` or below.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    high_threshold: f32,
    low_threshold: f32,
    state: bool,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(1.0, 0.1)
    }
}

impl EdgeDetector {
    pub fn new(high_threshold: f32, low_threshold: f32) -> Self {
        Self {
            high_threshold,
            low_threshold,
            state: false,
        }
    }

    /// Feed one sample. Returns true only on the sample that crosses upward.
    pub fn process(&mut self, voltage: f32) -> bool {
        if self.state {
            if voltage <= self.low_threshold {
                self.state = false;
            }
            false
        } else if voltage >= self.high_threshold {
            self.state = true;
            true
        } else {
            false
        }
    }

    /// Current latched level (true between a rising edge and the release)
    pub fn is_high(&self) -> bool {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_high_fires_once() {
        let mut edge = EdgeDetector::default();
        let fired = (0..1000).filter(|_| edge.process(5.0)).count();
        assert_eq!(fired, 1);
        assert!(edge.is_high());
    }

    #[test]
    fn test_hysteresis_ignores_chatter() {
        let mut edge = EdgeDetector::new(1.0, 0.1);
        assert!(edge.process(1.2));

        // Noise around the upper threshold never drops below the low threshold
        for v in [0.9, 1.1, 0.5, 1.3, 0.2, 1.0] {
            assert!(!edge.process(v), "chatter at {}V should not retrigger", v);
        }

        assert!(!edge.process(0.05));
        assert!(!edge.is_high());
        assert!(edge.process(1.0));
    }

    #[test]
    fn test_below_threshold_never_fires() {
        let mut edge = EdgeDetector::default();
        for _ in 0..100 {
            assert!(!edge.process(0.99));
        }
    }

    #[test]
    fn test_reset_rearms() {
        let mut edge = EdgeDetector::default();
        assert!(edge.process(10.0));
        edge.reset();
        assert!(edge.process(10.0));
    }
}
