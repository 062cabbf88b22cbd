//! 单元测试共用的事件与监听器夹具
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TestEvent {
    pub aggregate: String,
    pub id: EventId,
    pub payload: String,
    #[serde(default)]
    pub noop: bool,
}

impl TestEvent {
    pub fn new(aggregate: &str, id: u64, payload: &str) -> Self {
        Self {
            aggregate: aggregate.to_string(),
            id: EventId::from_value(id),
            payload: payload.to_string(),
            noop: false,
        }
    }

    pub fn noop(aggregate: &str) -> Self {
        Self {
            noop: true,
            ..Self::new(aggregate, 0, "noop")
        }
    }
}

impl Event for TestEvent {
    type AggregateId = String;

    fn aggregate_id(&self) -> &String {
        &self.aggregate
    }

    fn event_id(&self) -> EventId {
        self.id
    }

    fn event_type(&self) -> &'static str {
        "TestEvent"
    }

    fn is_noop(&self) -> bool {
        self.noop
    }
}
