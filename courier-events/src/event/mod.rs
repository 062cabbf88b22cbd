//! 事件模型（event）
//!
//! 纯数据与排序类型，不涉及 I/O：
//! - `EventId`：聚合内无间隙、单调递增的事件序号；
//! - `AggregateId` / `Event`：事件与其所属聚合的最小接口；
//! - `History`：单个聚合按序号升序排列的不可变事件序列。

mod event_id;
mod event_trait;
mod history;

pub use event_id::EventId;
pub use event_trait::{AggregateId, Event, belong_to_same_aggregate};
pub use history::History;
