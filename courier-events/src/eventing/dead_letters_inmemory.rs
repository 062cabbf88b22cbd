use super::dead_letters::{DeadLetter, EventDeadLetters, InsertionId};
use crate::{
    error::{EventError, EventResult},
    event::Event,
    routing::Group,
};
use async_trait::async_trait;
use chrono::Utc;
use futures_core::stream::BoxStream;
use futures_util::stream;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// 进程内死信存储
pub struct InMemoryEventDeadLetters<E> {
    letters: RwLock<HashMap<Group, Vec<DeadLetter<E>>>>,
}

impl<E> InMemoryEventDeadLetters<E> {
    pub fn new() -> Self {
        Self {
            letters: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> Default for InMemoryEventDeadLetters<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> EventDeadLetters<E> for InMemoryEventDeadLetters<E>
where
    E: Event,
{
    async fn store(&self, group: &Group, event: &E) -> EventResult<InsertionId> {
        if event.is_noop() {
            return Err(EventError::dead_letters(format!(
                "no-op event cannot be quarantined for group {group}"
            )));
        }

        let insertion_id = InsertionId::random();
        let letter = DeadLetter {
            insertion_id,
            group: group.clone(),
            event: event.clone(),
            stored_at: Utc::now(),
        };

        self.letters
            .write()
            .await
            .entry(group.clone())
            .or_default()
            .push(letter);

        debug!(group = %group, insertion_id = %insertion_id, "dead letter stored");
        Ok(insertion_id)
    }

    async fn remove(&self, group: &Group, insertion_id: &InsertionId) -> EventResult<()> {
        let mut letters = self.letters.write().await;
        if let Some(entries) = letters.get_mut(group) {
            entries.retain(|letter| letter.insertion_id != *insertion_id);
            if entries.is_empty() {
                letters.remove(group);
            }
        }
        Ok(())
    }

    async fn remove_group(&self, group: &Group) -> EventResult<()> {
        self.letters.write().await.remove(group);
        Ok(())
    }

    async fn failed_event(
        &self,
        group: &Group,
        insertion_id: &InsertionId,
    ) -> EventResult<Option<E>> {
        let letters = self.letters.read().await;
        Ok(letters.get(group).and_then(|entries| {
            entries
                .iter()
                .find(|letter| letter.insertion_id == *insertion_id)
                .map(|letter| letter.event.clone())
        }))
    }

    async fn failed_ids(&self, group: &Group) -> BoxStream<'static, EventResult<InsertionId>> {
        let ids: Vec<EventResult<InsertionId>> = self
            .letters
            .read()
            .await
            .get(group)
            .map(|entries| entries.iter().map(|l| Ok(l.insertion_id)).collect())
            .unwrap_or_default();

        Box::pin(stream::iter(ids))
    }

    async fn enumerate(&self, group: &Group) -> BoxStream<'static, EventResult<DeadLetter<E>>> {
        let entries: Vec<EventResult<DeadLetter<E>>> = self
            .letters
            .read()
            .await
            .get(group)
            .map(|entries| entries.iter().cloned().map(Ok).collect())
            .unwrap_or_default();

        Box::pin(stream::iter(entries))
    }

    async fn groups_with_failed_events(&self) -> BoxStream<'static, EventResult<Group>> {
        let groups: Vec<EventResult<Group>> = self
            .letters
            .read()
            .await
            .keys()
            .cloned()
            .map(Ok)
            .collect();

        Box::pin(stream::iter(groups))
    }

    async fn contain_events(&self) -> EventResult<bool> {
        Ok(self.letters.read().await.values().any(|v| !v.is_empty()))
    }
}
