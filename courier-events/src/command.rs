//! 命令调度（EventSourcingSystem）
//!
//! 一次命令调度依次执行：命令处理器生成事件 → 追加到事件存储 → 通知订阅者。
//! 三步之间不存在事务；追加出现并发冲突时整条命令（含处理器）重新执行。
//!
use crate::{
    error::{EventError, EventResult},
    event::{AggregateId, Event},
    persist::EventStore,
};
use async_trait::async_trait;
use bon::Builder;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 追加冲突时的默认重试次数
pub const DEFAULT_MAX_RETRIES: usize = 10;

/// 命令处理器：根据命令（可读取事件存储）生成新事件
#[async_trait]
pub trait CommandHandler<C, E>: Send + Sync
where
    C: Send + Sync,
    E: Event,
{
    async fn handle(&self, command: &C) -> EventResult<Vec<E>>;
}

/// 事件订阅者：在事件追加成功后收到每个事件
#[async_trait]
pub trait Subscriber<E>: Send + Sync
where
    E: Event,
{
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, event: &E) -> anyhow::Result<()>;
}

/// 事件溯源系统
#[derive(Builder)]
pub struct EventSourcingSystem<C, E>
where
    C: Send + Sync,
    E: Event,
{
    store: EventStore<E>,
    handler: Arc<dyn CommandHandler<C, E>>,
    #[builder(default)]
    subscribers: Vec<Arc<dyn Subscriber<E>>>,
    /// 首次尝试之外允许的重试次数
    #[builder(default = DEFAULT_MAX_RETRIES)]
    max_retries: usize,
}

impl<C, E> EventSourcingSystem<C, E>
where
    C: Send + Sync,
    E: Event,
{
    pub fn store(&self) -> &EventStore<E> {
        &self.store
    }

    /// 调度命令，返回已追加的事件
    ///
    /// 冲突重试耗尽后返回 `TooManyRetries`；订阅者失败只记录日志。
    #[instrument(level = "debug", skip_all)]
    pub async fn dispatch(&self, command: &C) -> EventResult<Vec<E>> {
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            let events = self.handler.handle(command).await?;

            match self.store.append_all(&events).await {
                Ok(()) => {
                    self.notify(&events).await;
                    return Ok(events);
                }
                Err(err) if err.is_conflict() => {
                    warn!(attempt, error = %err, "append conflict, retrying command");
                }
                Err(err) => return Err(err),
            }
        }

        Err(EventError::TooManyRetries { attempts })
    }

    async fn notify(&self, events: &[E]) {
        for event in events.iter().filter(|e| !e.is_noop()) {
            for subscriber in &self.subscribers {
                if let Err(err) = subscriber.handle(event).await {
                    warn!(
                        subscriber = subscriber.name(),
                        aggregate = %event.aggregate_id().as_aggregate_key(),
                        event_id = %event.event_id(),
                        error = %err,
                        "subscriber failed"
                    );
                }
            }
        }
        debug!(events = events.len(), "subscribers notified");
    }
}
