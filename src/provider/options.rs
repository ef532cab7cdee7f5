//! Provider 配置项

use crate::config::parse_duration;
use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// 配置项声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// 配置键（kebab-case，命令行参数为 `--<kind>-<key>`）
    pub key: String,
    /// 帮助信息
    pub help: String,
    /// 默认值
    pub default: Option<String>,
}

impl OptionSpec {
    pub fn new(key: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            help: help.into(),
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Provider 配置（键值对，值为任意 JSON 值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderOptions {
    values: HashMap<String, Value>,
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置配置项
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// 为缺失的配置项填充声明中的默认值
    #[must_use]
    pub fn with_defaults(mut self, specs: &[OptionSpec]) -> Self {
        for spec in specs {
            if let Some(default) = &spec.default {
                self.values
                    .entry(spec.key.clone())
                    .or_insert_with(|| Value::String(default.clone()));
            }
        }
        self
    }

    /// 以字符串形式读取（数字、布尔值会被转换），空字符串视为未设置
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// 读取必填字符串
    pub fn require_str(&self, key: &str) -> Result<String, ProviderError> {
        self.get_str(key)
            .ok_or_else(|| ProviderError::invalid_option(key, "option is required"))
    }

    /// 读取布尔值（支持 true/false/1/0/yes/no）
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ProviderError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                _ => Err(ProviderError::invalid_option(
                    key,
                    format!("expected a boolean, got \"{}\"", s),
                )),
            },
            Some(other) => Err(ProviderError::invalid_option(
                key,
                format!("expected a boolean, got {}", other),
            )),
        }
    }

    /// 读取时长：字符串（"30s"、"1m"）或整数秒
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, ProviderError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|secs| Some(Duration::from_secs(secs)))
                .ok_or_else(|| {
                    ProviderError::invalid_option(key, format!("expected seconds, got {}", n))
                }),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => parse_duration(s)
                .map(Some)
                .map_err(|e| ProviderError::invalid_option(key, e.to_string())),
            Some(other) => Err(ProviderError::invalid_option(
                key,
                format!("expected a duration, got {}", other),
            )),
        }
    }
}

impl From<HashMap<String, Value>> for ProviderOptions {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}
