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

//! Matrix addressing: button grid scan or two external CVs.

use tracing::debug;

use crate::dsp::{BankLevels, PulseGenerator, TriggerBank};
use crate::matrix::{NoteMatrix, STEPS};
use crate::pitch::PitchCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// Pads on the 12x12 button grid
    Grid = 0,
    /// Row and column CV inputs
    External = 1,
}

impl AddressMode {
    pub fn from_f32(value: f32) -> Self {
        if value > 0.5 {
            AddressMode::External
        } else {
            AddressMode::Grid
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AddressMode::Grid => "Grid",
            AddressMode::External => "External",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
}

impl Coordinate {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// State of the 144 matrix pads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonGrid {
    cells: [[bool; STEPS]; STEPS],
}

impl ButtonGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Out-of-range cells are ignored
    pub fn set(&mut self, row: usize, col: usize, pressed: bool) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = pressed;
        }
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STEPS]; STEPS];
    }

    /// Last pressed cell in row-major order. The instrument is monophonic,
    /// so later cells simply shadow earlier ones.
    pub fn active_cell(&self) -> Option<Coordinate> {
        let mut active = None;
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, &pressed) in cells.iter().enumerate() {
                if pressed {
                    active = Some(Coordinate::new(row, col));
                }
            }
        }
        active
    }
}

/// Main trigger plus the per-row and per-column trigger banks
#[derive(Debug, Clone, Default)]
pub struct TriggerOutputs {
    pub main: PulseGenerator,
    pub rows: TriggerBank,
    pub cols: TriggerBank,
}

/// Levels of every trigger output for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TriggerLevels {
    pub main: bool,
    pub rows: BankLevels,
    pub cols: BankLevels,
}

impl TriggerOutputs {
    pub fn process(&mut self, delta_time: f32) -> TriggerLevels {
        TriggerLevels {
            main: self.main.process(delta_time),
            rows: self.rows.process(delta_time),
            cols: self.cols.process(delta_time),
        }
    }

    pub fn reset(&mut self) {
        self.main.reset();
        self.rows.reset();
        self.cols.reset();
    }
}

/// Map an addressing CV to a step index. `None` outside `[0, 12)`.
pub fn quantize_address(voltage: f32, scale: f32) -> Option<usize> {
    let step = (voltage * scale).floor();
    if step >= 0.0 && step < STEPS as f32 {
        Some(step as usize)
    } else {
        None
    }
}

/// Everything the engine reads on one tick
pub struct CoordinateInput<'a> {
    pub mode: AddressMode,
    pub row_cv: f32,
    pub col_cv: f32,
    pub matrix: &'a NoteMatrix,
    pub codec: &'a PitchCodec,
}

#[derive(Debug, Clone)]
pub struct CoordinateEngine {
    trigger_duration: f32,
    // CV to step factor for external addressing
    external_scale: f32,

    last_grid: Option<Coordinate>,
    last_grid_note: Option<Coordinate>,
    last_external: Option<Coordinate>,

    pitch: f32,
    grid_gate: bool,
}

impl CoordinateEngine {
    pub fn new(trigger_duration: f32, external_scale: f32) -> Self {
        Self {
            trigger_duration,
            external_scale,
            last_grid: None,
            last_grid_note: None,
            last_external: None,
            pitch: 0.0,
            grid_gate: false,
        }
    }

    /// Last emitted pitch CV (held between note events)
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Gate for grid mode. External mode derives its gate from the main trigger.
    pub fn grid_gate(&self) -> bool {
        self.grid_gate
    }

    pub fn last_external(&self) -> Option<Coordinate> {
        self.last_external
    }

    pub fn process(
        &mut self,
        input: &CoordinateInput<'_>,
        buttons: &mut ButtonGrid,
        triggers: &mut TriggerOutputs,
    ) {
        match input.mode {
            AddressMode::Grid => self.process_grid(input, buttons, triggers),
            AddressMode::External => self.process_external(input, buttons, triggers),
        }
    }

    fn process_grid(
        &mut self,
        input: &CoordinateInput<'_>,
        buttons: &ButtonGrid,
        triggers: &mut TriggerOutputs,
    ) {
        let current = buttons.active_cell();
        if current != self.last_grid {
            match current {
                None => self.grid_gate = false,
                Some(cell) => {
                    self.emit_note(cell, self.last_grid_note, input, triggers);
                    self.grid_gate = true;
                    self.last_grid_note = Some(cell);
                }
            }
        }
        self.last_grid = current;
    }

    fn process_external(
        &mut self,
        input: &CoordinateInput<'_>,
        buttons: &mut ButtonGrid,
        triggers: &mut TriggerOutputs,
    ) {
        let row = quantize_address(input.row_cv, self.external_scale);
        let col = quantize_address(input.col_cv, self.external_scale);
        let (Some(row), Some(col)) = (row, col) else {
            return;
        };

        let cell = Coordinate::new(row, col);
        if self.last_external == Some(cell) {
            return;
        }

        // Keep the pads showing the externally addressed cell
        if let Some(previous) = self.last_external {
            buttons.set(previous.row, previous.col, false);
        }
        buttons.set(row, col, true);

        self.emit_note(cell, self.last_external, input, triggers);
        debug!("external address row {} col {}", row, col);
        self.last_external = Some(cell);
    }

    fn emit_note(
        &mut self,
        cell: Coordinate,
        previous: Option<Coordinate>,
        input: &CoordinateInput<'_>,
        triggers: &mut TriggerOutputs,
    ) {
        let offset = input.matrix.get(cell.row, cell.col);
        self.pitch = input.codec.note_to_volt(offset);
        triggers.main.trigger(self.trigger_duration);

        if previous.map(|p| p.row) != Some(cell.row) {
            triggers.rows.fire(cell.row, self.trigger_duration);
        }
        if previous.map(|p| p.col) != Some(cell.col) {
            triggers.cols.fire(cell.col, self.trigger_duration);
        }
    }

    pub fn reset(&mut self) {
        self.last_grid = None;
        self.last_grid_note = None;
        self.last_external = None;
        self.pitch = 0.0;
        self.grid_gate = false;
    }
}
