//! 重试退避配置与退避序列
//!
//! 第 `i` 次重试（从 0 开始）前等待 `min(first * multiplier^i, max)`，
//! 再按 `delay * (1 ± jitter_factor)` 随机抖动。
//!
use crate::error::{EventError, EventResult};
use bon::Builder;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 重试退避配置，在总线生命周期内不可变
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct RetryBackoffConfig {
    /// 首次失败之后的最大重试次数
    #[serde(default = "defaults::max_retries")]
    #[builder(default = defaults::max_retries())]
    pub max_retries: u32,
    #[serde(default = "defaults::first_backoff_ms")]
    #[builder(default = defaults::first_backoff_ms())]
    pub first_backoff_ms: u64,
    #[serde(default = "defaults::multiplier")]
    #[builder(default = defaults::multiplier())]
    pub multiplier: f64,
    #[serde(default = "defaults::max_backoff_ms")]
    #[builder(default = defaults::max_backoff_ms())]
    pub max_backoff_ms: u64,
    /// 抖动比例，取值 `[0, 1]`
    #[serde(default = "defaults::jitter_factor")]
    #[builder(default = defaults::jitter_factor())]
    pub jitter_factor: f64,
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            first_backoff_ms: defaults::first_backoff_ms(),
            multiplier: defaults::multiplier(),
            max_backoff_ms: defaults::max_backoff_ms(),
            jitter_factor: defaults::jitter_factor(),
        }
    }
}

impl RetryBackoffConfig {
    /// 不重试：监听器失败一次即进入死信
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EventResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(EventError::invalid_config(format!(
                "retry multiplier must be >= 1, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(EventError::invalid_config(format!(
                "retry jitter factor must be within [0, 1], got {}",
                self.jitter_factor
            )));
        }
        if self.first_backoff_ms > self.max_backoff_ms {
            return Err(EventError::invalid_config(format!(
                "first backoff {}ms exceeds max backoff {}ms",
                self.first_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// 第 `retry` 次重试前的基础等待（不含抖动）
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let raw = self.first_backoff_ms as f64 * self.multiplier.powi(exponent);
        let capped = if raw.is_finite() {
            raw.min(self.max_backoff_ms as f64)
        } else {
            self.max_backoff_ms as f64
        };
        Duration::from_millis(capped as u64)
    }

    // 未经 validate 的配置也可能到达这里，NaN 与非正抖动一律视为不抖动
    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_factor.is_nan() || self.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }
        let millis = delay.as_millis() as f64;
        let range = millis * self.jitter_factor.min(1.0);
        let jitter: f64 = rand::rng().random_range(-range..=range);
        Duration::from_millis((millis + jitter).max(0.0) as u64)
    }

    /// 本配置对应的退避序列
    pub fn backoffs(&self) -> Backoff {
        Backoff {
            config: self.clone(),
            retry: 0,
        }
    }
}

/// 退避状态机：每次 `next` 给出下一次重试前的等待，预算耗尽时结束
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryBackoffConfig,
    retry: u32,
}

impl Backoff {
    /// 已经发出的重试次数
    pub fn retries(&self) -> u32 {
        self.retry
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retry >= self.config.max_retries {
            return None;
        }
        let delay = self.config.jittered(self.config.backoff_for(self.retry));
        self.retry += 1;
        Some(delay)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.max_retries.saturating_sub(self.retry) as usize;
        (remaining, Some(remaining))
    }
}

mod defaults {
    pub const fn max_retries() -> u32 {
        8
    }

    pub const fn first_backoff_ms() -> u64 {
        100
    }

    pub const fn multiplier() -> f64 {
        2.0
    }

    pub const fn max_backoff_ms() -> u64 {
        60_000
    }

    pub const fn jitter_factor() -> f64 {
        0.5
    }
}
