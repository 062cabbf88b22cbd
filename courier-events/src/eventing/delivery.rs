//! 单监听器投递（EventDelivery）
//!
//! 调用一个监听器处理一个事件：失败后按退避序列重试，预算耗尽时交给永久失败处理器
//! （写入死信）。投递本身从不向调用方返回错误。
//!
use super::{
    dead_letters::EventDeadLetters,
    listener::{EventListener, ExecutionMode},
    retry::{Backoff, RetryBackoffConfig},
};
use crate::{
    event::{AggregateId, Event},
    routing::Group,
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// 失败后的重试策略
#[derive(Debug, Clone)]
pub enum Retryer {
    NoRetry,
    Backoff {
        config: RetryBackoffConfig,
        group: Group,
    },
}

impl Retryer {
    fn backoffs(&self) -> Backoff {
        match self {
            Retryer::NoRetry => RetryBackoffConfig::no_retries().backoffs(),
            Retryer::Backoff { config, .. } => config.backoffs(),
        }
    }
}

/// 重试耗尽后的处理
pub enum PermanentFailureHandler<E> {
    NoHandler,
    StoreToDeadLetters {
        group: Group,
        dead_letters: Arc<dyn EventDeadLetters<E>>,
    },
}

impl<E> Clone for PermanentFailureHandler<E> {
    fn clone(&self) -> Self {
        match self {
            Self::NoHandler => Self::NoHandler,
            Self::StoreToDeadLetters {
                group,
                dead_letters,
            } => Self::StoreToDeadLetters {
                group: group.clone(),
                dead_letters: dead_letters.clone(),
            },
        }
    }
}

/// 投递选项
pub struct DeliveryOption<E> {
    pub retryer: Retryer,
    pub permanent_failure_handler: PermanentFailureHandler<E>,
}

impl<E> Clone for DeliveryOption<E> {
    fn clone(&self) -> Self {
        Self {
            retryer: self.retryer.clone(),
            permanent_failure_handler: self.permanent_failure_handler.clone(),
        }
    }
}

impl<E> DeliveryOption<E> {
    /// 单次尝试，失败仅记录日志（键监听器）
    pub fn none() -> Self {
        Self {
            retryer: Retryer::NoRetry,
            permanent_failure_handler: PermanentFailureHandler::NoHandler,
        }
    }

    pub fn of(retryer: Retryer, permanent_failure_handler: PermanentFailureHandler<E>) -> Self {
        Self {
            retryer,
            permanent_failure_handler,
        }
    }

    /// 分组监听器：退避重试，耗尽后写入死信
    pub fn for_group(
        group: &Group,
        config: &RetryBackoffConfig,
        dead_letters: Arc<dyn EventDeadLetters<E>>,
    ) -> Self {
        Self::of(
            Retryer::Backoff {
                config: config.clone(),
                group: group.clone(),
            },
            PermanentFailureHandler::StoreToDeadLetters {
                group: group.clone(),
                dead_letters,
            },
        )
    }

    fn group(&self) -> Option<&Group> {
        match (&self.retryer, &self.permanent_failure_handler) {
            (Retryer::Backoff { group, .. }, _) => Some(group),
            (_, PermanentFailureHandler::StoreToDeadLetters { group, .. }) => Some(group),
            _ => None,
        }
    }
}

/// 投递执行器
#[derive(Debug, Clone)]
pub struct EventDelivery {
    bus: Arc<str>,
}

impl EventDelivery {
    pub fn new(bus: impl Into<Arc<str>>) -> Self {
        Self { bus: bus.into() }
    }

    /// 投递一个事件
    ///
    /// 监听器不处理该事件时直接返回；异步模式的监听器在运行时上独立执行，
    /// 本方法不等待其完成。
    pub async fn deliver<E>(
        &self,
        listener: Arc<dyn EventListener<E>>,
        event: E,
        option: DeliveryOption<E>,
    ) where
        E: Event,
    {
        if !listener.is_handling(&event) {
            return;
        }

        match listener.execution_mode() {
            ExecutionMode::Synchronous => self.run(listener, event, option).await,
            ExecutionMode::Asynchronous => {
                let this = self.clone();
                tokio::spawn(async move { this.run(listener, event, option).await });
            }
        }
    }

    async fn run<E>(
        &self,
        listener: Arc<dyn EventListener<E>>,
        event: E,
        option: DeliveryOption<E>,
    ) where
        E: Event,
    {
        let mut backoffs = option.retryer.backoffs();

        loop {
            let err = match invoke(listener.as_ref(), &event).await {
                Ok(()) => return,
                Err(err) => err,
            };

            match backoffs.next() {
                Some(delay) => {
                    warn!(
                        bus = %self.bus,
                        group = option.group().map(|g| g.as_str()),
                        aggregate = %event.aggregate_id().as_aggregate_key(),
                        event_id = %event.event_id(),
                        attempt = backoffs.retries(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "listener failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    self.on_permanent_failure(&option, &event, err).await;
                    return;
                }
            }
        }
    }

    async fn on_permanent_failure<E>(
        &self,
        option: &DeliveryOption<E>,
        event: &E,
        err: anyhow::Error,
    ) where
        E: Event,
    {
        let aggregate = event.aggregate_id().as_aggregate_key();

        match &option.permanent_failure_handler {
            PermanentFailureHandler::NoHandler => {
                warn!(
                    bus = %self.bus,
                    aggregate = %aggregate,
                    event_id = %event.event_id(),
                    error = %err,
                    "listener failed"
                );
            }
            PermanentFailureHandler::StoreToDeadLetters {
                group,
                dead_letters,
            } => {
                error!(
                    bus = %self.bus,
                    group = %group,
                    aggregate = %aggregate,
                    event_id = %event.event_id(),
                    error = %err,
                    "retries exhausted, storing event in dead letters"
                );

                match dead_letters.store(group, event).await {
                    Ok(insertion_id) => debug!(
                        bus = %self.bus,
                        group = %group,
                        insertion_id = %insertion_id,
                        "dead letter recorded"
                    ),
                    Err(store_err) => error!(
                        bus = %self.bus,
                        group = %group,
                        aggregate = %aggregate,
                        event_id = %event.event_id(),
                        error = %store_err,
                        "failed to store dead letter"
                    ),
                }
            }
        }
    }
}

/// 调用监听器，panic 视为一次失败
async fn invoke<E>(listener: &dyn EventListener<E>, event: &E) -> anyhow::Result<()>
where
    E: Event,
{
    match AssertUnwindSafe(listener.handle(event)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!(
            "listener panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::{InMemoryEventDeadLetters, listener_fn};
    use crate::testing::TestEvent;
    use async_trait::async_trait;
    use futures_util::TryStreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn config(max_retries: u32) -> RetryBackoffConfig {
        RetryBackoffConfig::builder()
            .max_retries(max_retries)
            .first_backoff_ms(10)
            .jitter_factor(0.0)
            .build()
    }

    fn group_option(
        group: &Group,
        max_retries: u32,
        dead_letters: &Arc<InMemoryEventDeadLetters<TestEvent>>,
    ) -> DeliveryOption<TestEvent> {
        DeliveryOption::for_group(group, &config(max_retries), dead_letters.clone())
    }

    fn counting_listener(
        fail_times: usize,
    ) -> (Arc<dyn EventListener<TestEvent>>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let listener = listener_fn(move |_: &TestEvent| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(n >= fail_times, "failure #{n}");
            Ok(())
        });
        (listener, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_store_one_dead_letter() {
        let dead_letters = Arc::new(InMemoryEventDeadLetters::<TestEvent>::new());
        let group = Group::new("indexer");
        let (listener, calls) = counting_listener(usize::MAX);
        let event = TestEvent::new("A", 0, "x");

        EventDelivery::new("test")
            .deliver(
                listener,
                event.clone(),
                group_option(&group, 3, &dead_letters),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let letters: Vec<_> = dead_letters.enumerate(&group).await.try_collect().await.unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].event, event);
    }

    #[tokio::test(start_paused = true)]
    async fn success_within_budget_leaves_no_dead_letter() {
        let dead_letters = Arc::new(InMemoryEventDeadLetters::<TestEvent>::new());
        let group = Group::new("indexer");
        let (listener, calls) = counting_listener(2);

        EventDelivery::new("test")
            .deliver(
                listener,
                TestEvent::new("A", 0, "x"),
                group_option(&group, 2, &dead_letters),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!dead_letters.contain_events().await.unwrap());
    }

    #[tokio::test]
    async fn none_option_tries_once() {
        let (listener, calls) = counting_listener(usize::MAX);

        EventDelivery::new("test")
            .deliver(listener, TestEvent::new("A", 0, "x"), DeliveryOption::none())
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panic_is_treated_as_failure() {
        let dead_letters = Arc::new(InMemoryEventDeadLetters::<TestEvent>::new());
        let group = Group::new("panicky");
        let listener = listener_fn(|_: &TestEvent| -> anyhow::Result<()> { panic!("boom") });

        EventDelivery::new("test")
            .deliver(
                listener,
                TestEvent::new("A", 0, "x"),
                group_option(&group, 0, &dead_letters),
            )
            .await;

        assert!(dead_letters.contain_events().await.unwrap());
    }

    struct Selective {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventListener<TestEvent> for Selective {
        async fn handle(&self, _event: &TestEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_handling(&self, event: &TestEvent) -> bool {
            event.payload == "wanted"
        }
    }

    #[tokio::test]
    async fn unhandled_events_are_skipped() {
        let listener = Arc::new(Selective {
            calls: AtomicUsize::new(0),
        });
        let shared: Arc<dyn EventListener<TestEvent>> = listener.clone();
        let delivery = EventDelivery::new("test");

        delivery
            .deliver(shared.clone(), TestEvent::new("A", 0, "other"), DeliveryOption::none())
            .await;
        delivery
            .deliver(shared, TestEvent::new("A", 1, "wanted"), DeliveryOption::none())
            .await;

        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }

    struct Gated {
        gate: Arc<Notify>,
        done: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventListener<TestEvent> for Gated {
        async fn handle(&self, _event: &TestEvent) -> anyhow::Result<()> {
            self.gate.notified().await;
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn execution_mode(&self) -> ExecutionMode {
            ExecutionMode::Asynchronous
        }
    }

    #[tokio::test]
    async fn asynchronous_listener_does_not_block() {
        let gate = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));
        let listener: Arc<dyn EventListener<TestEvent>> = Arc::new(Gated {
            gate: gate.clone(),
            done: done.clone(),
        });

        EventDelivery::new("test")
            .deliver(listener, TestEvent::new("A", 0, "x"), DeliveryOption::none())
            .await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        gate.notify_one();
        while done.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    }
}
