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

use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::parameters::Parameterizable;

/// 処理のコンテキスト - ホストから渡される1ブロック分の情報
#[derive(Debug)]
pub struct ProcessContext {
    /// 入力バッファ群
    pub inputs: InputBuffers,
    /// 出力バッファ群
    pub outputs: OutputBuffers,
    /// サンプリングレート
    pub sample_rate: f32,
    /// バッファサイズ
    pub buffer_size: usize,
    /// 処理タイムスタンプ（サンプル数）
    pub timestamp: u64,
}

impl ProcessContext {
    /// Create a new processing context
    pub fn new(inputs: InputBuffers, outputs: OutputBuffers, sample_rate: f32, buffer_size: usize) -> Self {
        Self {
            inputs,
            outputs,
            sample_rate,
            buffer_size,
            timestamp: 0,
        }
    }

    /// Seconds per sample
    pub fn delta_time(&self) -> f32 {
        1.0 / self.sample_rate
    }
}

/// 入力CVバッファの管理
#[derive(Debug, Default)]
pub struct InputBuffers {
    cv_buffers: HashMap<String, Vec<f32>>,
}

impl InputBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// CVバッファを追加
    pub fn add_cv(&mut self, port_name: &str, buffer: Vec<f32>) {
        self.cv_buffers.insert(port_name.to_string(), buffer);
    }

    /// CVバッファを取得
    pub fn get_cv(&self, port_name: &str) -> Option<&[f32]> {
        self.cv_buffers.get(port_name).map(|v| v.as_slice())
    }

    /// サンプル単位の読み出し。短いバッファは最後の値を保持し、未接続は0V
    pub fn cv_at(&self, port_name: &str, index: usize) -> f32 {
        match self.get_cv(port_name) {
            Some(buffer) => buffer
                .get(index)
                .or_else(|| buffer.last())
                .copied()
                .unwrap_or(0.0),
            None => 0.0,
        }
    }
}

/// 出力CVバッファの管理
#[derive(Debug, Default)]
pub struct OutputBuffers {
    cv_buffers: HashMap<String, Vec<f32>>,
}

impl OutputBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// CV出力バッファを確保
    pub fn allocate_cv(&mut self, port_name: &str, size: usize) {
        self.cv_buffers.insert(port_name.to_string(), vec![0.0; size]);
    }

    /// CV出力バッファを取得（読み取り専用）
    pub fn get_cv(&self, port_name: &str) -> Option<&[f32]> {
        self.cv_buffers.get(port_name).map(|v| v.as_slice())
    }

    /// 確保済みなら1サンプル書き込む
    pub fn write_cv(&mut self, port_name: &str, index: usize, value: f32) {
        if let Some(sample) = self.cv_buffers.get_mut(port_name).and_then(|b| b.get_mut(index)) {
            *sample = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    /// Continuous control voltage (pitch, addressing)
    CV,
    /// Gate or trigger (0V / high)
    Gate,
}

/// ノード情報
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: Uuid,
    pub name: String,
    pub node_type: String,
    pub category: NodeCategory,
    pub description: String,
    pub input_ports: Vec<PortInfo>,
    pub output_ports: Vec<PortInfo>,
    pub latency_samples: u32,
}

/// ノードカテゴリ
#[derive(Debug, Clone, PartialEq)]
pub enum NodeCategory {
    Controller,
}

/// ポート情報
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub port_type: PortType,
    pub description: String,
    pub is_optional: bool,
}

impl PortInfo {
    pub fn new(name: &str, port_type: PortType) -> Self {
        Self {
            name: name.to_string(),
            port_type,
            description: String::new(),
            is_optional: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }
}

/// ホストが駆動するノードのトレイト
pub trait AudioNode: Send + Sync + Parameterizable {
    /// 1ブロック分の処理を実行
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ProcessingError>;

    /// ノード情報を取得
    fn node_info(&self) -> &NodeInfo;

    /// ノードをリセット（内部状態をクリア）
    fn reset(&mut self);

    /// ダウンキャスト用のas_anyメソッド
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// 処理エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    /// 出力バッファの準備エラー
    #[error("Output buffer error for port: {port_name}")]
    OutputBufferError { port_name: String },
}
