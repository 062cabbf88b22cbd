//! 事件监听器（EventListener）
//!
//! 总线只认识一种能力：`handle(event)`。同步闭包与返回 future 的闭包
//! 通过 `listener_fn` / `async_listener_fn` 适配为同一协议。
//!
use crate::{event::Event, routing::Group};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// 投递执行方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// 分发等待本次投递（含重试）完成
    #[default]
    Synchronous,
    /// 投递在运行时上独立执行，分发不等待
    Asynchronous,
}

/// 事件监听器
#[async_trait]
pub trait EventListener<E>: Send + Sync
where
    E: Event,
{
    /// 处理事件；返回错误即视为本次投递失败
    async fn handle(&self, event: &E) -> anyhow::Result<()>;

    /// 是否关心该事件，返回 `false` 时不会投递
    fn is_handling(&self, _event: &E) -> bool {
        true
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Synchronous
    }
}

/// 分组监听器：携带与运行实例无关的稳定分组名
pub trait GroupEventListener<E>: EventListener<E>
where
    E: Event,
{
    fn default_group(&self) -> Group;
}

#[async_trait]
impl<E, L> EventListener<E> for Arc<L>
where
    E: Event,
    L: EventListener<E> + ?Sized,
{
    async fn handle(&self, event: &E) -> anyhow::Result<()> {
        (**self).handle(event).await
    }

    fn is_handling(&self, event: &E) -> bool {
        (**self).is_handling(event)
    }

    fn execution_mode(&self) -> ExecutionMode {
        (**self).execution_mode()
    }
}

struct FnListener<F> {
    f: F,
}

#[async_trait]
impl<E, F> EventListener<E> for FnListener<F>
where
    E: Event,
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, event: &E) -> anyhow::Result<()> {
        (self.f)(event)
    }
}

struct AsyncFnListener<F> {
    f: F,
}

#[async_trait]
impl<E, F> EventListener<E> for AsyncFnListener<F>
where
    E: Event,
    F: Fn(E) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync,
{
    async fn handle(&self, event: &E) -> anyhow::Result<()> {
        (self.f)(event.clone()).await
    }
}

/// 将同步闭包包装为监听器
pub fn listener_fn<E, F>(f: F) -> Arc<dyn EventListener<E>>
where
    E: Event,
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnListener { f })
}

/// 将返回 future 的闭包包装为监听器
pub fn async_listener_fn<E, F>(f: F) -> Arc<dyn EventListener<E>>
where
    E: Event,
    F: Fn(E) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
{
    Arc::new(AsyncFnListener { f })
}
