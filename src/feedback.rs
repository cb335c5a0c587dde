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

use crate::matrix::STEPS;

/// Observer for teach-mode progress (row position lights and a status line)
pub trait TeachFeedback: Send + Sync {
    fn set_light(&mut self, position: usize, on: bool);

    fn set_status(&mut self, text: &str);

    fn clear_lights(&mut self) {
        for position in 0..STEPS {
            self.set_light(position, false);
        }
    }

    fn fill_lights(&mut self) {
        for position in 0..STEPS {
            self.set_light(position, true);
        }
    }
}

/// In-memory panel that remembers the last state it was told to show
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPanel {
    lights: [bool; STEPS],
    status: String,
}

impl Default for IndicatorPanel {
    fn default() -> Self {
        Self {
            lights: [false; STEPS],
            status: vec!["-"; STEPS].join(" "),
        }
    }
}

impl IndicatorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lights(&self) -> &[bool; STEPS] {
        &self.lights
    }

    pub fn light(&self, position: usize) -> bool {
        self.lights.get(position).copied().unwrap_or(false)
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl TeachFeedback for IndicatorPanel {
    fn set_light(&mut self, position: usize, on: bool) {
        if let Some(light) = self.lights.get_mut(position) {
            *light = on;
        }
    }

    fn set_status(&mut self, text: &str) {
        self.status.clear();
        self.status.push_str(text);
    }
}
