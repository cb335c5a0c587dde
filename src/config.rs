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

//! Engine Configuration
//!
//! Voltage levels, timing and thresholds, loaded from `serial-matrix.toml`.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::errors::{MatrixError, MatrixResult};
use crate::matrix::STEPS;

pub const CONFIG_FILE_NAME: &str = "serial-matrix.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f32,         // Hz, host clock for the CLI
    pub buffer_size: usize,       // samples per process call
    pub trigger_duration: f32,    // seconds
    pub gate_voltage: f32,        // V
    pub trigger_voltage: f32,     // V
    pub edge_high_threshold: f32, // V, Schmitt rising threshold
    pub edge_low_threshold: f32,  // V, Schmitt re-arm threshold
    pub external_range: f32,      // V, full scale of the row/col CVs
    pub default_reference_voltage: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            buffer_size: 512,
            trigger_duration: 1e-3,
            gate_voltage: 10.0,
            trigger_voltage: 10.0,
            edge_high_threshold: 1.0,
            edge_low_threshold: 0.1,
            external_range: 10.0,
            default_reference_voltage: 1.0,
        }
    }
}

impl EngineConfig {
    /// Load config from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MatrixResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MatrixError::io("read config", path, e))?;

        Self::parse(&content, &path.display().to_string())
    }

    /// Load config from TOML string
    pub fn load_from_str(content: &str) -> MatrixResult<Self> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, file: &str) -> MatrixResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| MatrixError::ConfigParsing {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> MatrixResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| MatrixError::ConfigParsing {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| MatrixError::io("write config", path, e))
    }

    /// `$XDG_CONFIG_HOME/serial-matrix/serial-matrix.toml` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("serial-matrix").join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> MatrixResult<()> {
        if !(self.sample_rate > 0.0) {
            return Err(MatrixError::InvalidConfig {
                field: "sample_rate",
                reason: format!("must be positive, got {}", self.sample_rate),
            });
        }

        if self.buffer_size == 0 {
            return Err(MatrixError::InvalidConfig {
                field: "buffer_size",
                reason: "must be at least one sample".to_string(),
            });
        }

        if !(self.trigger_duration > 0.0) {
            return Err(MatrixError::InvalidConfig {
                field: "trigger_duration",
                reason: format!("must be positive, got {}", self.trigger_duration),
            });
        }

        if self.edge_low_threshold >= self.edge_high_threshold {
            return Err(MatrixError::InvalidConfig {
                field: "edge_low_threshold",
                reason: format!(
                    "{} must be below edge_high_threshold {}",
                    self.edge_low_threshold, self.edge_high_threshold
                ),
            });
        }

        if !(self.external_range > 0.0) {
            return Err(MatrixError::InvalidConfig {
                field: "external_range",
                reason: format!("must be positive, got {}", self.external_range),
            });
        }

        Ok(())
    }

    /// Factor mapping a row/column CV to a step index (`11.999 / 10` at 10V)
    pub fn external_scale(&self) -> f32 {
        (STEPS as f32 - 0.001) / self.external_range
    }
}
