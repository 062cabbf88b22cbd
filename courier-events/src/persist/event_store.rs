//! 事件存储（EventStore）
//!
//! 追加前在本层完成全部校验（同一聚合、序号连续），随后把期望的尾部序号交给后端做
//! 比较并交换；后端的并发拒绝以 `AppendConflict` 返回，其余故障统一包装为
//! `EventStoreFailed`。本层不做任何重试。
//!
use super::serialized_event::{EventSerializer, JsonEventSerializer, SerializedEvent};
use crate::{
    error::{EventError, EventResult},
    event::{AggregateId, Event, EventId, History, belong_to_same_aggregate},
};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// 存储后端错误
#[derive(Debug, Error)]
pub enum BackendError {
    /// 存储中的尾部序号与期望不符
    #[error("tail mismatch for {aggregate_key}: expected {expected:?}, actual {actual:?}")]
    Conflict {
        aggregate_key: String,
        expected: Option<EventId>,
        actual: Option<EventId>,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 事件存储后端协议
///
/// 实现方必须保证：`append` 在尾部序号等于 `expected_tail` 时原子地写入整批事件，
/// 否则返回 `BackendError::Conflict` 且不写入任何事件；`load` 按序号升序返回。
#[async_trait]
pub trait EventStoreBackend: Send + Sync {
    async fn append(
        &self,
        aggregate_key: &str,
        expected_tail: Option<EventId>,
        events: Vec<SerializedEvent>,
    ) -> Result<(), BackendError>;

    async fn load(&self, aggregate_key: &str) -> Result<Vec<SerializedEvent>, BackendError>;

    /// 删除聚合的全部事件，聚合不存在时静默成功
    async fn remove(&self, aggregate_key: &str) -> Result<(), BackendError>;
}

#[async_trait]
impl<T> EventStoreBackend for Arc<T>
where
    T: EventStoreBackend + ?Sized,
{
    async fn append(
        &self,
        aggregate_key: &str,
        expected_tail: Option<EventId>,
        events: Vec<SerializedEvent>,
    ) -> Result<(), BackendError> {
        (**self).append(aggregate_key, expected_tail, events).await
    }

    async fn load(&self, aggregate_key: &str) -> Result<Vec<SerializedEvent>, BackendError> {
        (**self).load(aggregate_key).await
    }

    async fn remove(&self, aggregate_key: &str) -> Result<(), BackendError> {
        (**self).remove(aggregate_key).await
    }
}

/// 按聚合分区的只追加事件日志
pub struct EventStore<E> {
    backend: Arc<dyn EventStoreBackend>,
    serializer: Arc<dyn EventSerializer<E>>,
}

impl<E> Clone for EventStore<E> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            serializer: self.serializer.clone(),
        }
    }
}

impl<E> EventStore<E>
where
    E: Event,
{
    pub fn new(
        backend: Arc<dyn EventStoreBackend>,
        serializer: Arc<dyn EventSerializer<E>>,
    ) -> Self {
        Self {
            backend,
            serializer,
        }
    }

    /// 使用 JSON 序列化
    pub fn with_json(backend: Arc<dyn EventStoreBackend>) -> Self
    where
        E: Serialize + DeserializeOwned,
    {
        Self::new(backend, Arc::new(JsonEventSerializer::<E>::new()))
    }

    /// 追加一批事件
    ///
    /// 空批次与仅含 no-op 的批次直接成功；批次中的事件必须属于同一聚合且序号连续，
    /// 首个事件的前驱即期望的尾部序号。
    #[instrument(level = "debug", skip_all, fields(events = events.len()))]
    pub async fn append_all(&self, events: &[E]) -> EventResult<()> {
        let events: Vec<&E> = events.iter().filter(|e| !e.is_noop()).collect();

        let Some(first) = events.first() else {
            return Ok(());
        };

        if !belong_to_same_aggregate(events.iter().copied()) {
            return Err(EventError::invalid_append(
                "events of one batch must belong to the same aggregate",
            ));
        }

        for pair in events.windows(2) {
            if pair[0].event_id().checked_next() != Some(pair[1].event_id()) {
                return Err(EventError::invalid_append(format!(
                    "event ids must be contiguous, {} followed by {}",
                    pair[0].event_id(),
                    pair[1].event_id()
                )));
            }
        }

        let aggregate_key = first.aggregate_id().as_aggregate_key();
        let expected_tail = first.event_id().previous();

        let serialized = events
            .iter()
            .map(|e| self.serializer.serialize(e))
            .collect::<EventResult<Vec<_>>>()?;

        self.backend
            .append(&aggregate_key, expected_tail, serialized)
            .await
            .map_err(|err| Self::backend_error(&aggregate_key, err))?;

        debug!(
            aggregate = %aggregate_key,
            first = %first.event_id(),
            count = events.len(),
            "events appended"
        );

        Ok(())
    }

    /// 读取聚合的完整历史，未写入过的聚合返回空历史
    #[instrument(level = "debug", skip_all, fields(aggregate = %aggregate_id.as_aggregate_key()))]
    pub async fn load(&self, aggregate_id: &E::AggregateId) -> EventResult<History<E>> {
        let aggregate_key = aggregate_id.as_aggregate_key();

        let stored = self
            .backend
            .load(&aggregate_key)
            .await
            .map_err(|err| Self::backend_error(&aggregate_key, err))?;

        let events = stored
            .iter()
            .map(|e| self.serializer.deserialize(e))
            .collect::<EventResult<Vec<_>>>()?;

        History::of(events)
    }

    pub async fn remove(&self, aggregate_id: &E::AggregateId) -> EventResult<()> {
        let aggregate_key = aggregate_id.as_aggregate_key();

        self.backend
            .remove(&aggregate_key)
            .await
            .map_err(|err| Self::backend_error(&aggregate_key, err))
    }

    fn backend_error(aggregate_key: &str, err: BackendError) -> EventError {
        match err {
            BackendError::Conflict {
                aggregate_key,
                expected,
                actual,
            } => EventError::AppendConflict {
                aggregate_key,
                expected,
                actual,
            },
            BackendError::Other(source) => EventError::EventStoreFailed {
                aggregate_key: aggregate_key.to_string(),
                source,
            },
        }
    }
}
