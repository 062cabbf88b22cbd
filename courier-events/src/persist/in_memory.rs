use super::{BackendError, EventStoreBackend, SerializedEvent};
use crate::event::EventId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// 进程内事件存储后端
///
/// 以聚合键分区，写锁内完成尾部比较与追加，保证同一聚合的追加串行化。
#[derive(Debug, Default)]
pub struct InMemoryEventStoreBackend {
    streams: RwLock<HashMap<String, Vec<SerializedEvent>>>,
}

impl InMemoryEventStoreBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> BackendError {
        BackendError::Other(anyhow::anyhow!("event stream lock poisoned"))
    }
}

#[async_trait]
impl EventStoreBackend for InMemoryEventStoreBackend {
    async fn append(
        &self,
        aggregate_key: &str,
        expected_tail: Option<EventId>,
        events: Vec<SerializedEvent>,
    ) -> Result<(), BackendError> {
        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;

        let actual = streams
            .get(aggregate_key)
            .and_then(|stream| stream.last())
            .map(|e| e.event_id());

        if actual != expected_tail {
            return Err(BackendError::Conflict {
                aggregate_key: aggregate_key.to_string(),
                expected: expected_tail,
                actual,
            });
        }

        // 被拒绝的追加不在表中留下空分区
        streams
            .entry(aggregate_key.to_string())
            .or_default()
            .extend(events);
        Ok(())
    }

    async fn load(&self, aggregate_key: &str) -> Result<Vec<SerializedEvent>, BackendError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams.get(aggregate_key).cloned().unwrap_or_default())
    }

    async fn remove(&self, aggregate_key: &str) -> Result<(), BackendError> {
        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;
        streams.remove(aggregate_key);
        Ok(())
    }
}
