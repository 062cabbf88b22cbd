//! 事件总线（EventBus）协议
//!
//! 两种监听器模型：
//! - 键监听器：随分发携带的键集合路由，尽力投递，失败只记录日志；
//! - 分组监听器：每个分组至多一个，收到全部事件，失败重试并最终进入死信。
//!
use super::{
    listener::{EventListener, GroupEventListener},
    registration::Registration,
};
use crate::{
    error::EventResult,
    event::Event,
    routing::{Group, RegistrationKey},
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    /// 总线名称，用于日志
    fn name(&self) -> &str;

    /// 按键注册监听器，总是成功
    fn register(&self, listener: Arc<dyn EventListener<E>>, key: RegistrationKey) -> Registration;

    /// 按分组注册监听器；分组已被占用时返回 `GroupAlreadyRegistered`
    fn register_group(
        &self,
        listener: Arc<dyn EventListener<E>>,
        group: Group,
    ) -> EventResult<Registration>;

    /// 以监听器自身声明的分组注册
    fn register_group_listener<L>(&self, listener: Arc<L>) -> EventResult<Registration>
    where
        L: GroupEventListener<E> + 'static,
        Self: Sized,
    {
        let group = listener.default_group();
        self.register_group(listener, group)
    }

    /// 分发事件：全部分组监听器与 `keys` 命中的键监听器并发投递
    ///
    /// 监听器失败不会返回给调用方；no-op 事件直接返回。
    async fn dispatch(&self, event: &E, keys: &HashSet<RegistrationKey>) -> EventResult<()>;

    /// 依次分发多个事件
    async fn dispatch_batch(&self, events: &[(E, HashSet<RegistrationKey>)]) -> EventResult<()> {
        for (event, keys) in events {
            self.dispatch(event, keys).await?;
        }
        Ok(())
    }

    /// 向分组当前的监听器重投事件，沿用分组的重试与死信策略
    async fn re_deliver(&self, group: &Group, event: &E) -> EventResult<()>;

    fn list_registered_groups(&self) -> HashSet<Group>;
}
