//! 事件子系统（eventing）
//!
//! - `EventBus` / `InMemoryEventBus`：监听器注册（按键、按分组）与事件分发；
//! - `EventDelivery`：单监听器投递，含退避重试与永久失败处理；
//! - `EventDeadLetters`：重试耗尽事件的隔离存储；
//! - `DeadLettersRedeliverer`：死信重投；
//! - `DispatchingSubscriber`：把事件存储的追加结果接入总线。
//!
mod bus;
mod bus_inmemory;
mod dead_letters;
mod dead_letters_inmemory;
mod delivery;
mod listener;
mod redeliver;
mod registration;
mod registry;
mod retry;
mod subscriber;

pub use bus::EventBus;
pub use bus_inmemory::{EventBusConfig, InMemoryEventBus};
pub use dead_letters::{DeadLetter, EventDeadLetters, InsertionId};
pub use dead_letters_inmemory::InMemoryEventDeadLetters;
pub use delivery::{DeliveryOption, EventDelivery, PermanentFailureHandler, Retryer};
pub use listener::{
    EventListener, ExecutionMode, GroupEventListener, async_listener_fn, listener_fn,
};
pub use redeliver::{DeadLettersRedeliverer, RedeliveryReport};
pub use registration::Registration;
pub use retry::{Backoff, RetryBackoffConfig};
pub use subscriber::DispatchingSubscriber;
