use async_trait::async_trait;
use courier_events::event::{Event, EventId};
use courier_events::eventing::{EventListener, GroupEventListener};
use courier_macros::listener_group;

#[derive(Debug, Clone)]
struct Ping {
    mailbox: String,
    id: EventId,
}

impl Event for Ping {
    type AggregateId = String;

    fn aggregate_id(&self) -> &String {
        &self.mailbox
    }

    fn event_id(&self) -> EventId {
        self.id
    }
}

#[listener_group(event = Ping)]
struct Indexer;

#[async_trait]
impl EventListener<Ping> for Indexer {
    async fn handle(&self, _event: &Ping) -> anyhow::Result<()> {
        Ok(())
    }
}

#[listener_group(name = "quota-recomputer")]
struct QuotaRecomputer {
    _threshold: u64,
}

fn main() {
    assert!(Indexer::GROUP_NAME.ends_with("::Indexer"));
    assert_eq!(Indexer.default_group(), Indexer::group());
    assert_eq!(QuotaRecomputer::group().as_str(), "quota-recomputer");

    let _ = Ping {
        mailbox: "inbox".to_string(),
        id: EventId::first(),
    };
}
