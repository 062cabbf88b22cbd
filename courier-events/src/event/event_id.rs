use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EventError;

/// 聚合内的事件序号
///
/// 以 `first()` 为起点、每次固定递增 1 的无间隙单调序列，作用域为单个聚合。
/// 一经持久化即不可复用、不可修改。
///
/// # 示例
///
/// ```
/// use courier_events::event::EventId;
///
/// let first = EventId::first();
/// assert_eq!(first.value(), 0);
/// assert!(first.previous().is_none());
///
/// let second = first.next();
/// assert!(second > first);
/// assert_eq!(second.previous(), Some(first));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// 序列起点（位置 0）
    pub const fn first() -> Self {
        Self(0)
    }

    /// 从原始值创建（通常仅用于存储层还原）
    pub const fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// 紧随其后的序号
    ///
    /// 在 `u64::MAX` 上调用会溢出；处理外部输入时使用 [`EventId::checked_next`]。
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 紧随其后的序号；序列已到上限时返回 `None`
    pub fn checked_next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// 紧邻的前一个序号；对 `first()` 调用返回 `None`
    pub fn previous(&self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn is_first(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<EventId> for u64 {
    fn from(id: EventId) -> Self {
        id.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_has_no_previous() {
        assert_eq!(EventId::first().value(), 0);
        assert!(EventId::first().is_first());
        assert!(EventId::first().previous().is_none());
    }

    #[test]
    fn next_then_previous_is_identity() {
        for raw in [0_u64, 1, 7, 1_000] {
            let x = EventId::from_value(raw);
            assert_eq!(x.next().previous(), Some(x));
        }
    }

    #[test]
    fn next_is_strictly_greater() {
        let x = EventId::from_value(41);
        assert!(x.next() > x);
        assert!(x.next().next() > x.next());
        assert_eq!(x.next().value() - x.value(), 1);
    }

    #[test]
    fn checked_next_stops_at_the_upper_bound() {
        assert_eq!(
            EventId::from_value(4).checked_next(),
            Some(EventId::from_value(5))
        );
        assert_eq!(EventId::from_value(u64::MAX).checked_next(), None);
    }

    #[test]
    fn display_and_parse() {
        let id = EventId::from_value(12);
        assert_eq!(id.to_string(), "12");
        assert_eq!("12".parse::<EventId>().unwrap(), id);
        assert!(matches!(
            "twelve".parse::<EventId>(),
            Err(EventError::Parse { .. })
        ));
    }

    // 序列化为裸整数，便于存储层作为分区内排序键
    #[test]
    fn serde_transparent() {
        let id = EventId::from_value(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "3");
        assert_eq!(serde_json::from_str::<EventId>(&json).unwrap(), id);
    }
}
