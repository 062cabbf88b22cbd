//! 死信重投（DeadLettersRedeliverer）
//!
//! 通过 `EventBus::re_deliver` 把死信交还给分组当前的监听器。
//! `re_deliver` 返回 `Ok` 后删除原记录：若再次永久失败，事件已经以新的
//! 记录重新进入死信。分组未注册等错误会保留原记录。
//!
use super::{
    bus::EventBus,
    dead_letters::{EventDeadLetters, InsertionId},
};
use crate::{error::EventResult, event::Event, routing::Group};
use futures_util::TryStreamExt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 重投结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedeliveryReport {
    pub successful: usize,
    pub failed: usize,
}

impl RedeliveryReport {
    fn merge(&mut self, other: RedeliveryReport) {
        self.successful += other.successful;
        self.failed += other.failed;
    }
}

pub struct DeadLettersRedeliverer<E>
where
    E: Event,
{
    bus: Arc<dyn EventBus<E>>,
    dead_letters: Arc<dyn EventDeadLetters<E>>,
}

impl<E> DeadLettersRedeliverer<E>
where
    E: Event,
{
    pub fn new(bus: Arc<dyn EventBus<E>>, dead_letters: Arc<dyn EventDeadLetters<E>>) -> Self {
        Self { bus, dead_letters }
    }

    /// 重投全部分组的死信
    #[instrument(level = "info", skip_all, fields(bus = %self.bus.name()))]
    pub async fn redeliver_all(&self) -> EventResult<RedeliveryReport> {
        let groups: Vec<Group> = self
            .dead_letters
            .groups_with_failed_events()
            .await
            .try_collect()
            .await?;

        let mut report = RedeliveryReport::default();
        for group in &groups {
            report.merge(self.redeliver_group(group).await?);
        }

        info!(
            successful = report.successful,
            failed = report.failed,
            "dead letters redelivered"
        );
        Ok(report)
    }

    pub async fn redeliver_group(&self, group: &Group) -> EventResult<RedeliveryReport> {
        let ids: Vec<InsertionId> = self.dead_letters.failed_ids(group).await.try_collect().await?;

        let mut report = RedeliveryReport::default();
        for insertion_id in &ids {
            report.merge(self.redeliver_one(group, insertion_id).await?);
        }
        Ok(report)
    }

    /// 重投单条死信；记录不存在时返回空统计
    pub async fn redeliver_one(
        &self,
        group: &Group,
        insertion_id: &InsertionId,
    ) -> EventResult<RedeliveryReport> {
        let Some(event) = self.dead_letters.failed_event(group, insertion_id).await? else {
            return Ok(RedeliveryReport::default());
        };

        match self.bus.re_deliver(group, &event).await {
            Ok(()) => {
                self.dead_letters.remove(group, insertion_id).await?;
                Ok(RedeliveryReport {
                    successful: 1,
                    failed: 0,
                })
            }
            Err(err) => {
                warn!(
                    bus = %self.bus.name(),
                    group = %group,
                    insertion_id = %insertion_id,
                    error = %err,
                    "redelivery failed, keeping dead letter"
                );
                Ok(RedeliveryReport {
                    successful: 0,
                    failed: 1,
                })
            }
        }
    }
}
