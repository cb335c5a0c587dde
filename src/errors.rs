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

use thiserror::Error;

use crate::parameters::ParameterError;
use crate::processing::ProcessingError;

/// SerialMatrix全体のエラー型
#[derive(Debug, Error)]
pub enum MatrixError {
    /// ファイルI/Oエラー
    #[error("File I/O error during {operation}: {path} - {source}")]
    Io {
        operation: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSONの解析エラー
    #[error("Invalid row data: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の解析エラー
    #[error("Config parsing error in {file}: {reason}")]
    ConfigParsing { file: String, reason: String },

    /// 設定値が不正
    #[error("Invalid config value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// 行データが不正
    #[error("Invalid row: {reason}")]
    InvalidRow { reason: String },

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),
}

impl MatrixError {
    pub fn io(operation: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        MatrixError::Io {
            operation: operation.to_string(),
            path: path.display().to_string(),
            source,
        }
    }

    pub fn invalid_row(reason: &str) -> Self {
        MatrixError::InvalidRow {
            reason: reason.to_string(),
        }
    }
}

/// 結果型のエイリアス
pub type MatrixResult<T> = Result<T, MatrixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MatrixError::io(
            "read",
            std::path::Path::new("/tmp/row.json"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let text = error.to_string();
        assert!(text.contains("/tmp/row.json"));
        assert!(text.contains("read"));
    }

    #[test]
    fn test_error_conversion() {
        let param_error = ParameterError::NotFound {
            name: "test".to_string(),
        };
        let matrix_error: MatrixError = param_error.into();

        match matrix_error {
            MatrixError::Parameter(ParameterError::NotFound { name }) => assert_eq!(name, "test"),
            _ => panic!("Expected Parameter error variant"),
        }
    }
}
