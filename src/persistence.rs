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

//! Taught row storage as a flat JSON array of twelve integers.

use std::path::Path;
use serde_json::Value;

use crate::errors::{MatrixError, MatrixResult};
use crate::matrix::{TaughtRow, STEPS, UNSET};

pub fn row_to_json(row: &TaughtRow) -> Value {
    Value::Array(row.offsets().iter().map(|&offset| Value::from(offset)).collect())
}

/// Lenient restore: anything that is not an integer at a given position
/// (including a missing position or a non-array root) becomes `UNSET`.
pub fn row_from_json(value: &Value) -> TaughtRow {
    let mut row = TaughtRow::unset();
    for index in 0..STEPS {
        let offset = value
            .get(index)
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(UNSET);
        row.set(index, offset);
    }
    row
}

pub fn save_row<P: AsRef<Path>>(row: &TaughtRow, path: P) -> MatrixResult<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(&row_to_json(row))?;
    std::fs::write(path, content).map_err(|e| MatrixError::io("write row", path, e))
}

/// Read a row file. The content must be JSON; its shape is restored leniently.
pub fn load_row<P: AsRef<Path>>(path: P) -> MatrixResult<TaughtRow> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| MatrixError::io("read row", path, e))?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(row_from_json(&value))
}

/// Parse `"0,2,4,..."` as typed on a command line. Requires exactly twelve
/// non-negative integers.
pub fn parse_row_list(text: &str) -> MatrixResult<TaughtRow> {
    let offsets = text
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<i32>()
                .map_err(|e| MatrixError::invalid_row(&format!("'{}': {}", token.trim(), e)))
        })
        .collect::<MatrixResult<Vec<i32>>>()?;

    if offsets.len() != STEPS {
        return Err(MatrixError::invalid_row(&format!(
            "expected {} offsets, got {}",
            STEPS,
            offsets.len()
        )));
    }
    if let Some(negative) = offsets.iter().find(|&&offset| offset < 0) {
        return Err(MatrixError::invalid_row(&format!("negative offset {}", negative)));
    }

    let mut row = TaughtRow::unset();
    for (index, offset) in offsets.into_iter().enumerate() {
        row.set(index, offset);
    }
    Ok(row)
}
