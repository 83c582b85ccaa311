//! 工具点击统计
//!
//! 每次点击追加一行 JSON 到数据目录下的日志文件，
//! 同时维护内存中的分类计数，启动时从日志重建。

pub mod recorder;

pub use recorder::{CategoryCount, ClickRecorder};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 事件类型：tool click
pub const EVENT_TOOL_CLICK: &str = "tc";

/// 日志中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEvent {
    #[serde(rename = "t")]
    pub kind: String,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "w")]
    pub category: String,
}

impl StatEvent {
    pub fn tool_click(category: impl Into<String>) -> Self {
        Self {
            kind: EVENT_TOOL_CLICK.to_string(),
            timestamp: Utc::now(),
            category: category.into(),
        }
    }
}
