use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// 注册凭证
///
/// 持有唯一的注销动作；`cancel` 可重复调用，只有第一次生效。
/// 丢弃凭证不会注销监听器。
pub struct Registration {
    cancelled: AtomicBool,
    unregister: Box<dyn Fn() + Send + Sync>,
}

impl Registration {
    pub(crate) fn new(unregister: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            unregister: Box::new(unregister),
        }
    }

    /// 注销；对已经开始的投递没有影响
    pub fn cancel(&self) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            (self.unregister)();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
