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

//! Twelve-tone row and the derived 12x12 transformation matrix.

use std::fmt;
use serde::{Deserialize, Serialize};

/// Number of steps in a row (and rows/columns in the matrix)
pub const STEPS: usize = 12;

/// Sentinel for a row slot that has not been taught yet
pub const UNSET: i32 = -1;

/// Ordered row of semitone offsets. Slots may hold `UNSET` while teaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaughtRow([i32; STEPS]);

impl Default for TaughtRow {
    fn default() -> Self {
        Self::chromatic()
    }
}

impl TaughtRow {
    pub fn new(offsets: [i32; STEPS]) -> Self {
        Self(offsets)
    }

    /// `[0, 1, ..., 11]`, the power-on row
    pub fn chromatic() -> Self {
        let mut offsets = [0; STEPS];
        for (i, slot) in offsets.iter_mut().enumerate() {
            *slot = i as i32;
        }
        Self(offsets)
    }

    pub fn unset() -> Self {
        Self([UNSET; STEPS])
    }

    pub fn get(&self, index: usize) -> i32 {
        self.0.get(index).copied().unwrap_or(UNSET)
    }

    pub fn set(&mut self, index: usize, offset: i32) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = offset;
        }
    }

    pub fn offsets(&self) -> &[i32; STEPS] {
        &self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|&offset| offset != UNSET)
    }

    /// True if a taught slot holds the same pitch class as `offset`
    pub fn contains_pitch_class(&self, offset: i32) -> bool {
        let class = offset.rem_euclid(STEPS as i32);
        self.0
            .iter()
            .filter(|&&taught| taught != UNSET)
            .any(|&taught| taught.rem_euclid(STEPS as i32) == class)
    }
}

impl fmt::Display for TaughtRow {
    /// Space separated, `-` for unset slots
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &offset) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if offset == UNSET {
                write!(f, "-")?;
            } else {
                write!(f, "{}", offset)?;
            }
        }
        Ok(())
    }
}

/// 12x12 grid of pitch offsets, indexed `[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMatrix {
    cells: [[i32; STEPS]; STEPS],
}

impl Default for NoteMatrix {
    fn default() -> Self {
        generate(&TaughtRow::default(), false)
    }
}

impl NoteMatrix {
    /// Offset at `(row, col)`. Out-of-range coordinates read as `UNSET`.
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(UNSET)
    }

    pub fn row(&self, row: usize) -> Option<&[i32; STEPS]> {
        self.cells.get(row)
    }

    pub fn rows(&self) -> &[[i32; STEPS]; STEPS] {
        &self.cells
    }
}

impl fmt::Display for NoteMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.cells.iter().enumerate() {
            write!(f, "{:2} |", r)?;
            for value in row {
                write!(f, " {:2}", value)?;
            }
            if r + 1 < STEPS {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Derive the transformation matrix from a taught row.
///
/// Row 0 is the row itself, column 0 its inversion `(12 - row[j]) mod 12`
/// (including `[0][0]`), and every other cell is `col0[i] + row0[j]`.
/// With `single_octave` set, row 0 and the interior are reduced mod 12.
/// Interior cells built from an unset slot stay unset.
pub fn generate(row: &TaughtRow, single_octave: bool) -> NoteMatrix {
    let mut cells = [[0; STEPS]; STEPS];
    let steps = STEPS as i32;
    let offsets = row.offsets();
    let reduce = |value: i32| if single_octave { value.rem_euclid(steps) } else { value };

    for j in 0..STEPS {
        cells[0][j] = if offsets[j] == UNSET { UNSET } else { reduce(offsets[j]) };
    }

    for i in 0..STEPS {
        cells[i][0] = (steps - offsets[i]).rem_euclid(steps);
    }

    for i in 1..STEPS {
        for j in 1..STEPS {
            cells[i][j] = if offsets[i] == UNSET || offsets[j] == UNSET {
                UNSET
            } else {
                reduce(cells[i][0] + offsets[j])
            };
        }
    }

    NoteMatrix { cells }
}
