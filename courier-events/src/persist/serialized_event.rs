//! 事件持久化模型（SerializedEvent）与序列化协作者
//!
//! 存储后端只看到 `SerializedEvent`，不感知具体事件类型；
//! `EventSerializer` 负责在二者之间双向转换，且必须保证往返后得到同一事件值。
//!
use crate::{
    error::{EventError, EventResult},
    event::{AggregateId, Event, EventId},
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 聚合分区键，来自 `AggregateId::as_aggregate_key`
    #[builder(into)]
    aggregate_key: String,
    /// 聚合内序号
    event_id: EventId,
    /// 事件类型，便于诊断与后端侧索引
    #[builder(into)]
    event_type: String,
    /// 事件负载
    payload: Value,
    /// 写入时间
    #[builder(default = Utc::now())]
    recorded_at: DateTime<Utc>,
}

impl SerializedEvent {
    pub fn aggregate_key(&self) -> &str {
        &self.aggregate_key
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// 事件序列化协作者
pub trait EventSerializer<E>: Send + Sync {
    fn serialize(&self, event: &E) -> EventResult<SerializedEvent>;

    fn deserialize(&self, event: &SerializedEvent) -> EventResult<E>;
}

/// 基于 serde_json 的默认序列化实现
pub struct JsonEventSerializer<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> JsonEventSerializer<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for JsonEventSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventSerializer<E> for JsonEventSerializer<E>
where
    E: Event + Serialize + DeserializeOwned,
{
    fn serialize(&self, event: &E) -> EventResult<SerializedEvent> {
        Ok(SerializedEvent::builder()
            .aggregate_key(event.aggregate_id().as_aggregate_key())
            .event_id(event.event_id())
            .event_type(event.event_type())
            .payload(serde_json::to_value(event)?)
            .build())
    }

    fn deserialize(&self, event: &SerializedEvent) -> EventResult<E> {
        let decoded: E = serde_json::from_value(event.payload.clone())?;

        if decoded.event_id() != event.event_id {
            return Err(EventError::Parse {
                reason: format!(
                    "payload event id {} does not match stored id {}",
                    decoded.event_id(),
                    event.event_id
                ),
            });
        }

        Ok(decoded)
    }
}
