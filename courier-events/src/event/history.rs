use std::ops::Deref;
use std::slice::Iter;
use std::vec::IntoIter;

use super::{AggregateId, Event, EventId};
use crate::error::{EventError, EventResult};

/// 聚合事件历史
///
/// 按 `EventId` 升序排列、从 `EventId::first()` 开始且无间隙，
/// 所有事件属于同一聚合。构造时校验上述不变式。
#[derive(Debug, Clone, PartialEq)]
pub struct History<E> {
    events: Vec<E>,
}

impl<E> History<E>
where
    E: Event,
{
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// 校验并构造历史
    pub fn of(events: Vec<E>) -> EventResult<Self> {
        let mut expected = Some(EventId::first());
        let mut aggregate: Option<&E::AggregateId> = None;

        for event in &events {
            let Some(expected_id) = expected.filter(|id| *id == event.event_id()) else {
                return Err(EventError::invalid_history(match expected {
                    Some(id) => format!("expected event id {id}, found {}", event.event_id()),
                    None => format!("event id {} exceeds the sequence bound", event.event_id()),
                }));
            };

            match aggregate {
                Some(id) if id != event.aggregate_id() => {
                    return Err(EventError::invalid_history(format!(
                        "events of {} and {} mixed in one history",
                        id.as_aggregate_key(),
                        event.aggregate_id().as_aggregate_key()
                    )));
                }
                Some(_) => {}
                None => aggregate = Some(event.aggregate_id()),
            }

            expected = expected_id.checked_next();
        }

        Ok(Self { events })
    }

    /// 最后一个事件的序号；空历史返回 `None`
    pub fn version(&self) -> Option<EventId> {
        self.events.last().map(|e| e.event_id())
    }

    /// 下一个待追加事件应使用的序号
    pub fn next_event_id(&self) -> EventId {
        self.version()
            .map(|v| v.next())
            .unwrap_or_else(EventId::first)
    }

    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, E> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<E> {
        self.events
    }
}

impl<E> Default for History<E>
where
    E: Event,
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<E> IntoIterator for History<E> {
    type Item = E;
    type IntoIter = IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a History<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl<E> Deref for History<E> {
    type Target = [E];

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}
