//! 配置模块，负责加载JSON配置文件

use crate::editor::DEFAULT_DEBOUNCE;
use crate::format::{EqualityQuoteFormatter, PlainFormatter, TokenFormatter};
use crate::highlight::HighlightRule;
use crate::suggest::SuggestionCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {}", .0.display())]
    NotFound(PathBuf),
    #[error("无法读取配置文件 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析JSON配置文件 {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 编辑器配置, 所有字段都有默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 输入防抖时间（毫秒）
    pub debounce_ms: u64,
    /// 选择 `:` 之后的值时是否自动加引号
    pub quote_equality_values: bool,
    /// 高亮规则
    pub highlight_rules: Vec<HighlightRule>,
    /// 静态候选项
    pub suggestions: SuggestionCatalog,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            quote_equality_values: true,
            highlight_rules: Vec::new(),
            suggestions: SuggestionCatalog::default(),
        }
    }
}

impl EditorConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::NotFound(path_ref.to_path_buf()));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;

        // 解析JSON
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 根据配置选择值的格式化方式
    pub fn formatter(&self) -> Box<dyn TokenFormatter> {
        if self.quote_equality_values {
            Box::new(EqualityQuoteFormatter)
        } else {
            Box::new(PlainFormatter)
        }
    }
}
