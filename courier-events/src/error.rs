//! 事件核心统一错误定义
//!
//! 聚焦序列化、事件存储、事件总线与命令调度的最小必要集合。
//! 监听器自身的失败（`anyhow::Error`）不会转换为 `EventError`：
//! 它们由投递层吸收（键监听器记录日志，分组监听器重试后进入死信）。
//!
use crate::event::EventId;
use crate::routing::Group;
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    // --- 序列化/解析 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },

    // --- 事件存储 ---
    #[error("invalid append: {reason}")]
    InvalidAppend { reason: String },
    #[error(
        "append conflict: aggregate={aggregate_key}, expected_tail={expected:?}, actual_tail={actual:?}"
    )]
    AppendConflict {
        aggregate_key: String,
        expected: Option<EventId>,
        actual: Option<EventId>,
    },
    #[error("event store failed: aggregate={aggregate_key}, reason={source}")]
    EventStoreFailed {
        aggregate_key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid history: {reason}")]
    InvalidHistory { reason: String },

    // --- 事件总线 ---
    #[error("group already registered: {group}")]
    GroupAlreadyRegistered { group: Group },
    #[error("group registration not found: {group}")]
    GroupRegistrationNotFound { group: Group },
    #[error("dead letters error: {reason}")]
    DeadLetters { reason: String },
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    // --- 命令调度 ---
    #[error("too many retries: command abandoned after {attempts} attempts")]
    TooManyRetries { attempts: usize },
}

impl EventError {
    pub fn invalid_append(reason: impl Into<String>) -> Self {
        Self::InvalidAppend {
            reason: reason.into(),
        }
    }

    pub fn invalid_history(reason: impl Into<String>) -> Self {
        Self::InvalidHistory {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn dead_letters(reason: impl Into<String>) -> Self {
        Self::DeadLetters {
            reason: reason.into(),
        }
    }

    /// 是否为乐观并发冲突（调用方可整体重试）
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AppendConflict { .. })
    }
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;

impl From<uuid::Error> for EventError {
    fn from(err: uuid::Error) -> Self {
        EventError::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<std::num::ParseIntError> for EventError {
    fn from(err: std::num::ParseIntError) -> Self {
        EventError::Parse {
            reason: err.to_string(),
        }
    }
}
