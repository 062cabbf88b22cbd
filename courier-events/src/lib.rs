//! 邮件服务的事件溯源与事件总线核心（courier-events）
//!
//! - 事件模型（`event`）：`Event`、`EventId`、`AggregateId` 与 `History`；
//! - 事件存储（`persist`）：按聚合分区、只追加、强制乐观并发的事件日志；
//! - 路由标识（`routing`）：`RegistrationKey` 与 `Group`；
//! - 命令调度（`command`）：命令 → 事件 → 存储 → 订阅者，冲突时整体重试；
//! - 事件子系统（`eventing`，默认开启）：事件总线、带退避重试的投递、死信与重投。
//!
//! 存储后端与死信后端以 trait 形式注入，本 crate 自带进程内实现。
//!
//! 典型用法：
//! 1. 用 `#[aggregate_id]` 定义聚合标识，为事件类型实现 `Event`；
//! 2. 基于 `EventStoreBackend` 构建 `EventStore`；
//! 3. 创建 `InMemoryEventBus`，注册分组监听器与键监听器；
//! 4. 通过 `EventSourcingSystem` 与 `DispatchingSubscriber` 串起命令到分发的完整流程。
//!
pub mod command;
pub mod error;
pub mod event;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod persist;
pub mod routing;

#[cfg(test)]
pub(crate) mod testing;

// 允许在本 crate 内部通过 ::courier_events 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::courier_events 路径。
extern crate self as courier_events;
