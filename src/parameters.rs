use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// パラメーター記述子 - 各パラメーターの特性を定義
pub trait ParameterDescriptor: Send + Sync + fmt::Debug {
    /// パラメーター名
    fn name(&self) -> &str;

    /// 表示名
    fn label(&self) -> &str {
        self.name()
    }

    /// 最小値
    fn min_value(&self) -> f32;

    /// 最大値
    fn max_value(&self) -> f32;

    /// デフォルト値
    fn default_value(&self) -> f32;

    /// 値の検証
    fn validate(&self, value: f32) -> Result<f32, ParameterError> {
        if value >= self.min_value() && value <= self.max_value() {
            Ok(value)
        } else {
            Err(ParameterError::OutOfRange {
                value,
                min: self.min_value(),
                max: self.max_value(),
            })
        }
    }

    /// 表示用の値フォーマット
    fn format_value(&self, value: f32) -> String {
        format!("{:.2}", value)
    }
}

/// パラメーターエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("Parameter '{name}' not found")]
    NotFound { name: String },
    #[error("Parameter value {value} out of range [{min}, {max}]")]
    OutOfRange { value: f32, min: f32, max: f32 },
    #[error("Parameter '{name}' is read-only")]
    ReadOnly { name: String },
}

/// パラメーター管理トレイト - ノードのパラメーター操作を統一
pub trait Parameterizable: Send + Sync {
    /// パラメーターを設定
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), ParameterError>;

    /// パラメーターを取得
    fn get_parameter(&self, name: &str) -> Result<f32, ParameterError>;

    /// 全パラメーターを取得
    fn get_all_parameters(&self) -> HashMap<String, f32>;

    /// パラメーター記述子一覧を取得
    fn get_parameter_descriptors(&self) -> Vec<Box<dyn ParameterDescriptor>>;

    /// パラメーターが存在するかチェック
    fn has_parameter(&self, name: &str) -> bool {
        self.get_parameter(name).is_ok()
    }
}

/// 基本的なパラメーター記述子の実装
#[derive(Debug, Clone)]
pub struct BasicParameter {
    pub name: String,
    pub label: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl BasicParameter {
    pub fn new(name: &str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            min,
            max,
            default,
        }
    }

    /// On/off switch (0.0 or 1.0, > 0.5 reads as on)
    pub fn switch(name: &str, label: &str) -> Self {
        Self::new(name, 0.0, 1.0, 0.0).with_label(label)
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

impl ParameterDescriptor for BasicParameter {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn min_value(&self) -> f32 {
        self.min
    }

    fn max_value(&self) -> f32 {
        self.max
    }

    fn default_value(&self) -> f32 {
        self.default
    }

    fn format_value(&self, value: f32) -> String {
        if self.min == 0.0 && self.max == 1.0 {
            if value > 0.5 { "On" } else { "Off" }.to_string()
        } else {
            format!("{:.2}", value)
        }
    }
}

/// Switch value as a float parameter
pub fn switch_value(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}
