mod common;

use common::{MailboxEvent, MailboxId, init_tracing, unique_mailbox};
use courier_events::error::EventError;
use courier_events::event::EventId;
use courier_events::persist::{
    EventStore, EventStoreBackend, InMemoryEventStoreBackend, SerializedEvent,
};
use std::sync::Arc;

fn store() -> (EventStore<MailboxEvent>, Arc<InMemoryEventStoreBackend>) {
    init_tracing();
    let backend = Arc::new(InMemoryEventStoreBackend::new());
    (EventStore::with_json(backend.clone()), backend)
}

#[tokio::test]
async fn appended_events_load_back_in_order() {
    let (store, _) = store();
    let events = vec![
        MailboxEvent::added("A-1", 0, 1),
        MailboxEvent::added("A-1", 1, 2),
        MailboxEvent::expunged("A-1", 2, 1),
    ];

    store.append_all(&events).await.unwrap();

    let history = store.load(&MailboxId::new("A-1")).await.unwrap();
    assert_eq!(history.events(), events.as_slice());
    assert_eq!(history.version(), Some(EventId::from_value(2)));
}

#[tokio::test]
async fn batches_continue_from_the_tail() {
    let (store, _) = store();
    let id = MailboxId::new("A-1");

    store
        .append_all(&[MailboxEvent::added("A-1", 0, 1)])
        .await
        .unwrap();
    let next = store.load(&id).await.unwrap().next_event_id();
    store
        .append_all(&[
            MailboxEvent::added("A-1", next.value(), 2),
            MailboxEvent::added("A-1", next.next().value(), 3),
        ])
        .await
        .unwrap();

    assert_eq!(store.load(&id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn aggregates_are_partitioned_by_key() {
    let (store, backend) = store();
    let inbox = unique_mailbox();
    let sent = unique_mailbox();

    store
        .append_all(&[MailboxEvent::added(&inbox, 0, 1)])
        .await
        .unwrap();
    store
        .append_all(&[MailboxEvent::added(&sent, 0, 7)])
        .await
        .unwrap();

    let raw: Vec<SerializedEvent> = backend.load(&format!("mailbox-{inbox}")).await.unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].event_type(), "mailbox.message_added");
    assert_eq!(store.load(&MailboxId::new(sent)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn mixed_batch_is_rejected_and_nothing_is_written() {
    let (store, _) = store();

    let err = store
        .append_all(&[
            MailboxEvent::added("A", 0, 1),
            MailboxEvent::added("B", 1, 1),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, EventError::InvalidAppend { .. }));
    assert!(store.load(&MailboxId::new("A")).await.unwrap().is_empty());
    assert!(store.load(&MailboxId::new("B")).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_writers_on_same_tail_conflict() {
    let (store, _) = store();

    let one = [MailboxEvent::added("A", 0, 1)];
    let two = [MailboxEvent::added("A", 0, 2)];
    let (first, second) = tokio::join!(store.append_all(&one), store.append_all(&two));

    let conflicts = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Err(err) if err.is_conflict()))
        .count();
    assert_eq!(conflicts, 1);
    assert!(first.is_ok() || second.is_ok());
    assert_eq!(store.load(&MailboxId::new("A")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn noops_are_never_persisted() {
    let (store, _) = store();

    store
        .append_all(&[MailboxEvent::noop("A"), MailboxEvent::added("A", 0, 1)])
        .await
        .unwrap();

    let history = store.load(&MailboxId::new("A")).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn remove_clears_the_aggregate() {
    let (store, _) = store();
    let id = MailboxId::new("A");

    store
        .append_all(&[MailboxEvent::added("A", 0, 1)])
        .await
        .unwrap();
    store.remove(&id).await.unwrap();
    store.remove(&MailboxId::new("never-written")).await.unwrap();

    assert!(store.load(&id).await.unwrap().is_empty());
    store
        .append_all(&[MailboxEvent::added("A", 0, 9)])
        .await
        .unwrap();
}
