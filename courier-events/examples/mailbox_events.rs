/// 邮箱事件示例
/// 展示 命令 -> 事件存储 -> 事件总线 -> 分组/键监听器 的完整流程，
/// 以及监听器持续失败后进入死信、修复后通过重投清空死信。
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use courier_events::command::{CommandHandler, EventSourcingSystem, Subscriber};
use courier_events::error::EventResult;
use courier_events::event::{Event, EventId};
use courier_events::eventing::{
    DeadLettersRedeliverer, DispatchingSubscriber, EventBus, EventBusConfig, EventDeadLetters,
    EventListener, InMemoryEventBus, InMemoryEventDeadLetters, RetryBackoffConfig, listener_fn,
};
use courier_events::persist::{EventStore, InMemoryEventStoreBackend};
use courier_events::routing::RegistrationKey;
use courier_macros::{aggregate_id, listener_group};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// 领域模型
// ============================================================================

#[aggregate_id(prefix = "mailbox")]
struct MailboxId(String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MessageAdded {
    mailbox: MailboxId,
    id: EventId,
    uid: u32,
    subject: String,
}

impl Event for MessageAdded {
    type AggregateId = MailboxId;

    fn aggregate_id(&self) -> &MailboxId {
        &self.mailbox
    }

    fn event_id(&self) -> EventId {
        self.id
    }

    fn event_type(&self) -> &'static str {
        "mailbox.message_added"
    }
}

struct Deliver {
    mailbox: MailboxId,
    subject: String,
}

struct DeliverHandler {
    store: EventStore<MessageAdded>,
}

#[async_trait]
impl CommandHandler<Deliver, MessageAdded> for DeliverHandler {
    async fn handle(&self, command: &Deliver) -> EventResult<Vec<MessageAdded>> {
        let history = self.store.load(&command.mailbox).await?;
        Ok(vec![MessageAdded {
            mailbox: command.mailbox.clone(),
            id: history.next_event_id(),
            uid: history.len() as u32 + 1,
            subject: command.subject.clone(),
        }])
    }
}

// ============================================================================
// 分组监听器：搜索索引（可切换为故障状态）
// ============================================================================

#[listener_group(name = "search-indexer", event = MessageAdded)]
struct SearchIndexer {
    healthy: AtomicBool,
}

#[async_trait]
impl EventListener<MessageAdded> for SearchIndexer {
    async fn handle(&self, event: &MessageAdded) -> anyhow::Result<()> {
        anyhow::ensure!(self.healthy.load(Ordering::SeqCst), "index is read-only");
        println!("indexed uid {} in {}", event.uid, event.mailbox);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter("courier_events=info")
        .init();

    let store = EventStore::<MessageAdded>::with_json(Arc::new(InMemoryEventStoreBackend::new()));
    let dead_letters = Arc::new(InMemoryEventDeadLetters::<MessageAdded>::new());

    let config = EventBusConfig::builder()
        .name("mail")
        .retry(
            RetryBackoffConfig::builder()
                .max_retries(2)
                .first_backoff_ms(20)
                .build(),
        )
        .build();
    let bus = Arc::new(InMemoryEventBus::<MessageAdded>::new(
        config,
        dead_letters.clone(),
    )?);

    let indexer = Arc::new(SearchIndexer {
        healthy: AtomicBool::new(false),
    });
    bus.register_group_listener(indexer.clone())?;

    let _imap_idle = bus.register(
        listener_fn(|event: &MessageAdded| {
            println!("IDLE: * {} EXISTS ({})", event.uid, event.subject);
            Ok(())
        }),
        RegistrationKey::new("mailbox:inbox"),
    );

    let subscriber: Arc<dyn Subscriber<MessageAdded>> = Arc::new(
        DispatchingSubscriber::<MessageAdded>::new(bus.clone(), |event| {
            HashSet::from([RegistrationKey::new(format!("mailbox:{}", event.mailbox))])
        }),
    );
    let system = EventSourcingSystem::builder()
        .store(store.clone())
        .handler(Arc::new(DeliverHandler {
            store: store.clone(),
        }) as Arc<dyn CommandHandler<Deliver, MessageAdded>>)
        .subscribers(vec![subscriber])
        .build();

    for subject in ["hello", "invoice", "newsletter"] {
        system
            .dispatch(&Deliver {
                mailbox: MailboxId::new("inbox"),
                subject: subject.to_string(),
            })
            .await?;
    }

    let history = store.load(&MailboxId::new("inbox")).await?;
    println!("inbox history: {} events", history.len());
    println!(
        "dead letters pending: {}",
        dead_letters.contain_events().await?
    );

    indexer.healthy.store(true, Ordering::SeqCst);
    let report = DeadLettersRedeliverer::<MessageAdded>::new(bus.clone(), dead_letters.clone())
        .redeliver_all()
        .await?;
    println!(
        "redelivered: {} ok, {} failed; dead letters pending: {}",
        report.successful,
        report.failed,
        dead_letters.contain_events().await?
    );

    Ok(())
}
