use courier_events::event::AggregateId;
use courier_macros::aggregate_id;
use uuid::Uuid;

#[aggregate_id(prefix = "mailbox")]
struct MailboxId(String);

#[aggregate_id]
#[derive(PartialOrd, Ord)]
struct UserId(Uuid);

fn main() {
    let id = MailboxId::new("inbox");
    assert_eq!(id.as_aggregate_key(), "mailbox-inbox");
    assert_eq!(id.to_string(), "inbox");
    assert_eq!(id.clone(), "inbox".parse::<MailboxId>().unwrap());

    let raw = Uuid::new_v4();
    let user = UserId::from(raw);
    assert_eq!(user.as_aggregate_key(), raw.to_string());
    assert!(user <= UserId::new(raw));
    let back: Uuid = user.into();
    assert_eq!(back, raw);
}
