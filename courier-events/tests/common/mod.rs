#![allow(dead_code)]

use async_trait::async_trait;
use courier_events::event::{Event, EventId};
use courier_events::eventing::{EventListener, ExecutionMode};
use courier_macros::aggregate_id;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .try_init();
}

/// 每个测试独占的邮箱名
pub fn unique_mailbox() -> String {
    format!("mbx-{}", Ulid::new())
}

#[aggregate_id(prefix = "mailbox")]
pub struct MailboxId(String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    MessageAdded { uid: u32, size: u64 },
    MessageExpunged { uid: u32 },
    FlagsUpdated { uid: u32, flags: Vec<String> },
    Noop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxEvent {
    pub mailbox: MailboxId,
    pub id: EventId,
    pub change: Change,
}

impl MailboxEvent {
    pub fn added(mailbox: &str, id: u64, uid: u32) -> Self {
        Self {
            mailbox: MailboxId::new(mailbox),
            id: EventId::from_value(id),
            change: Change::MessageAdded { uid, size: 1024 },
        }
    }

    pub fn expunged(mailbox: &str, id: u64, uid: u32) -> Self {
        Self {
            mailbox: MailboxId::new(mailbox),
            id: EventId::from_value(id),
            change: Change::MessageExpunged { uid },
        }
    }

    pub fn noop(mailbox: &str) -> Self {
        Self {
            mailbox: MailboxId::new(mailbox),
            id: EventId::first(),
            change: Change::Noop,
        }
    }
}

impl Event for MailboxEvent {
    type AggregateId = MailboxId;

    fn aggregate_id(&self) -> &MailboxId {
        &self.mailbox
    }

    fn event_id(&self) -> EventId {
        self.id
    }

    fn event_type(&self) -> &'static str {
        match self.change {
            Change::MessageAdded { .. } => "mailbox.message_added",
            Change::MessageExpunged { .. } => "mailbox.message_expunged",
            Change::FlagsUpdated { .. } => "mailbox.flags_updated",
            Change::Noop => "mailbox.noop",
        }
    }

    fn is_noop(&self) -> bool {
        matches!(self.change, Change::Noop)
    }
}

/// 前 `fail_times` 次调用失败，之后成功
pub struct Flaky {
    fail_times: usize,
    calls: AtomicUsize,
    mode: ExecutionMode,
}

impl Flaky {
    pub fn failing(fail_times: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_times,
            calls: AtomicUsize::new(0),
            mode: ExecutionMode::Synchronous,
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing(usize::MAX)
    }

    pub fn succeeding() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self: &Arc<Self>) -> Arc<dyn EventListener<MailboxEvent>> {
        self.clone()
    }
}

#[async_trait]
impl EventListener<MailboxEvent> for Flaky {
    async fn handle(&self, event: &MailboxEvent) -> anyhow::Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(
            n >= self.fail_times,
            "index unavailable for {} (attempt {n})",
            event.id
        );
        Ok(())
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

/// 记录同时处于处理中的调用数峰值
#[derive(Default)]
pub struct Gauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Gauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventListener<MailboxEvent> for Gauge {
    async fn handle(&self, _event: &MailboxEvent) -> anyhow::Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
