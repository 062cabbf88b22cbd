//! 路由标识（routing）
//!
//! - `RegistrationKey`：键监听器的路由键，事件随键集合一起分发；
//! - `Group`：分组监听器的稳定名称，每个分组至多一个监听器，
//!   死信以分组为维度存放与重投。
//!
use crate::error::{EventError, EventResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! routing_name {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = EventError;

            fn from_str(s: &str) -> EventResult<Self> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(EventError::Parse {
                        reason: concat!($label, " must not be empty").to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

routing_name!(
    /// 键监听器路由键
    RegistrationKey,
    "registration key"
);

routing_name!(
    /// 分组监听器名称
    ///
    /// 同一总线内唯一；分组名是死信记录的归属维度，
    /// 因此重启后仍应保持不变（通常取类型的全限定名）。
    Group,
    "group"
);
