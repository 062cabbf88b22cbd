//! 死信（EventDeadLetters）
//!
//! 保存分组在重试耗尽后仍无法处理的事件，供运维检查与重投。
//! 本模块只定义数据协作者，不包含任何自动过期或重试逻辑。
//!
use crate::{
    error::{EventError, EventResult},
    event::{AggregateId, Event},
    routing::Group,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 死信记录标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsertionId(Uuid);

impl InsertionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InsertionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for InsertionId {
    type Err = EventError;

    fn from_str(s: &str) -> EventResult<Self> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// 一条死信
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter<E> {
    pub insertion_id: InsertionId,
    pub group: Group,
    pub event: E,
    pub stored_at: DateTime<Utc>,
}

/// 死信存储协议
#[async_trait]
pub trait EventDeadLetters<E>: Send + Sync
where
    E: Event,
{
    /// 保存 (group, event)，返回新记录的标识
    ///
    /// 实现无法保存时返回 `EventError::DeadLetters`。
    async fn store(&self, group: &Group, event: &E) -> EventResult<InsertionId>;

    /// 删除指定记录；记录不存在时静默成功
    async fn remove(&self, group: &Group, insertion_id: &InsertionId) -> EventResult<()>;

    /// 删除分组下的全部记录
    async fn remove_group(&self, group: &Group) -> EventResult<()>;

    async fn failed_event(
        &self,
        group: &Group,
        insertion_id: &InsertionId,
    ) -> EventResult<Option<E>>;

    async fn failed_ids(&self, group: &Group) -> BoxStream<'static, EventResult<InsertionId>>;

    /// 分组下的全部死信，流可重复获取
    async fn enumerate(&self, group: &Group) -> BoxStream<'static, EventResult<DeadLetter<E>>>;

    async fn groups_with_failed_events(&self) -> BoxStream<'static, EventResult<Group>>;

    async fn contain_events(&self) -> EventResult<bool>;

    /// 按聚合与事件序号删除分组下匹配的记录
    async fn remove_event(&self, group: &Group, event: &E) -> EventResult<()> {
        use futures_util::StreamExt;

        let mut letters = self.enumerate(group).await;
        let mut matched = Vec::new();
        while let Some(letter) = letters.next().await {
            let letter = letter?;
            if letter.event.event_id() == event.event_id()
                && letter.event.aggregate_id() == event.aggregate_id()
            {
                matched.push(letter.insertion_id);
            }
        }

        for insertion_id in matched {
            self.remove(group, &insertion_id).await?;
        }

        tracing::debug!(
            group = %group,
            aggregate = %event.aggregate_id().as_aggregate_key(),
            event_id = %event.event_id(),
            "dead letters removed for event"
        );
        Ok(())
    }
}
