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

/// Retriggerable one-shot. Durations are in seconds.
#[derive(Debug, Clone, Default)]
pub struct PulseGenerator {
    remaining: f32,
}

impl PulseGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or extend) the pulse. A retrigger never shortens a running pulse.
    pub fn trigger(&mut self, duration: f32) {
        if duration > self.remaining {
            self.remaining = duration;
        }
    }

    /// Advance by `delta_time` seconds and report whether the pulse is high
    /// for this sample.
    pub fn process(&mut self, delta_time: f32) -> bool {
        if self.remaining > 0.0 {
            self.remaining -= delta_time;
            true
        } else {
            false
        }
    }

    pub fn is_high(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

/// Twelve indexed trigger channels plus one "any channel fired" aggregate.
#[derive(Debug, Clone, Default)]
pub struct TriggerBank {
    channels: [PulseGenerator; STEPS],
    any: PulseGenerator,
}

/// Levels of a `TriggerBank` for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BankLevels {
    pub channels: [bool; STEPS],
    pub any: bool,
}

impl TriggerBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire channel `index` and the aggregate. Out-of-range indices are ignored.
    pub fn fire(&mut self, index: usize, duration: f32) {
        if let Some(channel) = self.channels.get_mut(index) {
            channel.trigger(duration);
            self.any.trigger(duration);
        }
    }

    pub fn process(&mut self, delta_time: f32) -> BankLevels {
        let mut levels = BankLevels::default();
        for (level, channel) in levels.channels.iter_mut().zip(self.channels.iter_mut()) {
            *level = channel.process(delta_time);
        }
        levels.any = self.any.process(delta_time);
        levels
    }

    pub fn reset(&mut self) {
        self.channels.iter_mut().for_each(PulseGenerator::reset);
        self.any.reset();
    }
}
