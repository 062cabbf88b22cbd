//! courier-events 的配套属性宏
//!
//! - `#[aggregate_id]`：把单字段 tuple struct 变为聚合标识；
//! - `#[listener_group]`：为分组监听器生成稳定的分组名。
//!
mod aggregate_id;
mod attr_args;
mod derive_utils;
mod listener_group;

use proc_macro::TokenStream;

/// 聚合标识宏
///
/// 仅支持单字段 tuple struct（例如 `struct MailboxId(String);`、`struct UserId(Uuid);`），生成：
/// - 派生：Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize（与已有 derive 合并）
/// - `new(value)`、`Display`、`FromStr`、`AsRef`、双向 `From`
/// - `::courier_events::event::AggregateId` 实现
///
/// 参数：`#[aggregate_id(prefix = "mailbox")]` 时分区键为 `mailbox-{inner}`，默认即内部值。
#[proc_macro_attribute]
pub fn aggregate_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    aggregate_id::expand(attr, item)
}

/// 分组监听器宏
///
/// 为结构体生成 `GROUP_NAME` 常量与 `group()`，默认名称为
/// `module_path!() + "::" + 类型名`，保证跨进程重启稳定。
///
/// 参数：
/// - `name = "..."` 覆写分组名；
/// - `event = Type` 同时实现 `GroupEventListener<Type>`（要求已实现 `EventListener<Type>`）。
#[proc_macro_attribute]
pub fn listener_group(attr: TokenStream, item: TokenStream) -> TokenStream {
    listener_group::expand(attr, item)
}
