use super::bus::EventBus;
use crate::{command::Subscriber, event::Event, routing::RegistrationKey};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

type KeysFn<E> = dyn Fn(&E) -> HashSet<RegistrationKey> + Send + Sync;

/// 把追加成功的事件转发到事件总线
///
/// 每个事件携带的路由键由 `keys` 计算。
pub struct DispatchingSubscriber<E>
where
    E: Event,
{
    bus: Arc<dyn EventBus<E>>,
    keys: Box<KeysFn<E>>,
}

impl<E> DispatchingSubscriber<E>
where
    E: Event,
{
    pub fn new(
        bus: Arc<dyn EventBus<E>>,
        keys: impl Fn(&E) -> HashSet<RegistrationKey> + Send + Sync + 'static,
    ) -> Self {
        Self {
            bus,
            keys: Box::new(keys),
        }
    }

    /// 只投递给分组监听器
    pub fn groups_only(bus: Arc<dyn EventBus<E>>) -> Self {
        Self::new(bus, |_| HashSet::new())
    }
}

#[async_trait]
impl<E> Subscriber<E> for DispatchingSubscriber<E>
where
    E: Event,
{
    fn name(&self) -> &str {
        self.bus.name()
    }

    async fn handle(&self, event: &E) -> anyhow::Result<()> {
        let keys = (self.keys)(event);
        self.bus.dispatch(event, &keys).await?;
        Ok(())
    }
}
