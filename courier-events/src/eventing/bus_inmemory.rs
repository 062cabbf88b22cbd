//! 进程内事件总线（InMemoryEventBus）
//!
//! 注册表见 `registry`；分发时先对两个注册表各取一次快照，
//! 再以 `execution_rate` 为并发上限同时执行分组与键两路投递。
//!
use super::{
    bus::EventBus,
    dead_letters::EventDeadLetters,
    delivery::{DeliveryOption, EventDelivery},
    listener::EventListener,
    registration::Registration,
    registry::{GroupRegistry, KeyRegistry},
    retry::RetryBackoffConfig,
};
use crate::{
    error::{EventError, EventResult},
    event::{AggregateId, Event},
    routing::{Group, RegistrationKey},
};
use async_trait::async_trait;
use bon::Builder;
use futures_util::{FutureExt, StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 事件总线配置
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// 总线名称
    #[serde(default = "defaults::name")]
    #[builder(into, default = defaults::name())]
    pub name: String,
    /// 单次分发中同时进行的投递上限
    #[serde(default = "defaults::execution_rate")]
    #[builder(default = defaults::execution_rate())]
    pub execution_rate: usize,
    #[serde(default)]
    #[builder(default)]
    pub retry: RetryBackoffConfig,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            name: defaults::name(),
            execution_rate: defaults::execution_rate(),
            retry: RetryBackoffConfig::default(),
        }
    }
}

impl EventBusConfig {
    pub fn validate(&self) -> EventResult<()> {
        if self.name.trim().is_empty() {
            return Err(EventError::invalid_config("bus name must not be empty"));
        }
        if self.execution_rate == 0 {
            return Err(EventError::invalid_config(
                "execution rate must be greater than zero",
            ));
        }
        self.retry.validate()
    }
}

mod defaults {
    pub fn name() -> String {
        "courier".to_string()
    }

    pub const fn execution_rate() -> usize {
        10
    }
}

/// 进程内事件总线
pub struct InMemoryEventBus<E>
where
    E: Event,
{
    config: EventBusConfig,
    keys: Arc<KeyRegistry<E>>,
    groups: Arc<GroupRegistry<E>>,
    delivery: EventDelivery,
    dead_letters: Arc<dyn EventDeadLetters<E>>,
}

impl<E> InMemoryEventBus<E>
where
    E: Event,
{
    pub fn new(
        config: EventBusConfig,
        dead_letters: Arc<dyn EventDeadLetters<E>>,
    ) -> EventResult<Self> {
        config.validate()?;

        Ok(Self {
            delivery: EventDelivery::new(config.name.as_str()),
            config,
            keys: KeyRegistry::new(),
            groups: GroupRegistry::new(),
            dead_letters,
        })
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    pub fn dead_letters(&self) -> Arc<dyn EventDeadLetters<E>> {
        self.dead_letters.clone()
    }

    fn group_option(&self, group: &Group) -> DeliveryOption<E> {
        DeliveryOption::for_group(group, &self.config.retry, self.dead_letters.clone())
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryEventBus<E>
where
    E: Event,
{
    fn name(&self) -> &str {
        &self.config.name
    }

    fn register(&self, listener: Arc<dyn EventListener<E>>, key: RegistrationKey) -> Registration {
        debug!(bus = %self.config.name, key = %key, "key listener registered");
        self.keys.register(key, listener)
    }

    fn register_group(
        &self,
        listener: Arc<dyn EventListener<E>>,
        group: Group,
    ) -> EventResult<Registration> {
        let registration = self.groups.register(group.clone(), listener)?;
        debug!(bus = %self.config.name, group = %group, "group listener registered");
        Ok(registration)
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(
            bus = %self.config.name,
            aggregate = %event.aggregate_id().as_aggregate_key(),
            event_id = %event.event_id()
        )
    )]
    async fn dispatch(&self, event: &E, keys: &HashSet<RegistrationKey>) -> EventResult<()> {
        if event.is_noop() {
            return Ok(());
        }

        let groups = self.groups.snapshot();
        let listeners = self.keys.snapshot(keys);
        let rate = self.config.execution_rate;

        debug!(
            groups = groups.len(),
            key_listeners = listeners.len(),
            "dispatching event"
        );

        let group_deliveries: Vec<_> = groups
            .into_iter()
            .map(|(group, listener)| {
                self.delivery
                    .deliver(listener, event.clone(), self.group_option(&group))
                    .boxed()
            })
            .collect();
        let key_deliveries: Vec<_> = listeners
            .into_iter()
            .map(|listener| {
                self.delivery
                    .deliver(listener, event.clone(), DeliveryOption::none())
                    .boxed()
            })
            .collect();

        let group_fanout = stream::iter(group_deliveries)
            .buffer_unordered(rate)
            .collect::<Vec<()>>();
        let key_fanout = stream::iter(key_deliveries)
            .buffer_unordered(rate)
            .collect::<Vec<()>>();

        future::join(group_fanout, key_fanout).await;
        Ok(())
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(
            bus = %self.config.name,
            group = %group,
            aggregate = %event.aggregate_id().as_aggregate_key(),
            event_id = %event.event_id()
        )
    )]
    async fn re_deliver(&self, group: &Group, event: &E) -> EventResult<()> {
        if event.is_noop() {
            return Ok(());
        }

        let listener = self
            .groups
            .get(group)
            .ok_or_else(|| EventError::GroupRegistrationNotFound {
                group: group.clone(),
            })?;

        self.delivery
            .deliver(listener, event.clone(), self.group_option(group))
            .await;
        Ok(())
    }

    fn list_registered_groups(&self) -> HashSet<Group> {
        self.groups.groups()
    }
}
