use std::fmt;
use std::hash::Hash;

use super::EventId;

/// 聚合标识
///
/// 值语义、不可变；`as_aggregate_key` 给出稳定的字符串键，
/// 作为存储层的分区键使用。可通过 `#[aggregate_id]` 宏为单字段元组结构体自动实现。
pub trait AggregateId: Clone + PartialEq + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    fn as_aggregate_key(&self) -> String;
}

impl AggregateId for String {
    fn as_aggregate_key(&self) -> String {
        self.clone()
    }
}

/// 事件：属于且仅属于一个聚合的不可变事实
pub trait Event: Clone + fmt::Debug + Send + Sync + 'static {
    type AggregateId: AggregateId;

    /// 所属聚合
    fn aggregate_id(&self) -> &Self::AggregateId;

    /// 聚合内序号
    fn event_id(&self) -> EventId;

    /// 事件类型名（用于日志与持久化形态）
    fn event_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 空操作事件：既不持久化也不分发
    fn is_noop(&self) -> bool {
        false
    }
}

/// 判断一批事件是否属于同一聚合（空集视为满足）
pub fn belong_to_same_aggregate<'a, E, I>(events: I) -> bool
where
    E: Event,
    I: IntoIterator<Item = &'a E>,
{
    let mut iter = events.into_iter();
    match iter.next() {
        None => true,
        Some(first) => iter.all(|e| e.aggregate_id() == first.aggregate_id()),
    }
}
