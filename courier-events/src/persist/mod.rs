//! 事件存储（persist）
//!
//! - `EventStore`：按聚合分区、只追加、强制乐观并发的事件日志；
//! - `EventStoreBackend`：存储后端协议，按 `aggregate_key` 分区；
//! - `EventSerializer`：事件与 `SerializedEvent` 之间的转换；
//! - `InMemoryEventStoreBackend`：进程内实现，用于测试与嵌入场景。
//!
mod event_store;
mod in_memory;
mod serialized_event;

pub use event_store::{BackendError, EventStore, EventStoreBackend};
pub use in_memory::InMemoryEventStoreBackend;
pub use serialized_event::{EventSerializer, JsonEventSerializer, SerializedEvent};
