//! Store integration tests. These need a live PostgreSQL; point
//! TEST_DATABASE_URL at one and run with `cargo test -- --ignored`.

use deadpool_postgres::Pool;
use uuid::Uuid;

use chat_delivery_service::db;
use chat_delivery_service::error::AppError;
use chat_delivery_service::models::MessageStatus;
use chat_delivery_service::services::{ChatService, MessageDraft, MessageService};

async fn test_pool() -> Pool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests");
    let pool = db::init_pool(&url).await.expect("connect test database");
    db::run_migrations(&pool).await.expect("run migrations");
    pool
}

/// Unique participant ids per test run so tests never collide.
fn participant(tag: &str) -> String {
    format!("{tag}{}", Uuid::new_v4().simple())
}

fn draft(chat_id: &str, content: &str, receiver: Option<&str>) -> MessageDraft {
    serde_json::from_value(serde_json::json!({
        "chat_id": chat_id,
        "content": content,
        "receiver_id": receiver,
    }))
    .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn create_or_get_direct_is_idempotent_and_symmetric() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));

    let first = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();
    let second = ChatService::create_or_get_direct(&pool, &b, &a).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);

    let listed = ChatService::list_for_participant(&pool, &a).await.unwrap();
    assert_eq!(listed.iter().filter(|c| c.id == first.id).count(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn concurrent_first_contact_converges_to_one_record() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));

    let (r1, r2) = tokio::join!(
        ChatService::create_or_get_direct(&pool, &a, &b),
        ChatService::create_or_get_direct(&pool, &b, &a),
    );
    assert_eq!(r1.unwrap().id, r2.unwrap().id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn page_returns_newest_first_with_has_more() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));
    let chat = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();

    for i in 0..5 {
        MessageService::append(&pool, &draft(&chat.id, &format!("msg {i}"), None), &a)
            .await
            .unwrap();
    }

    let first = MessageService::page(&pool, &chat.id, 0, 2).await.unwrap();
    assert_eq!(first.total, 5);
    assert!(first.has_more);
    assert_eq!(first.messages.len(), 2);
    assert_eq!(first.messages[0].content, "msg 4");
    assert_eq!(first.messages[1].content, "msg 3");

    let last = MessageService::page(&pool, &chat.id, 2, 2).await.unwrap();
    assert_eq!(last.messages.len(), 1);
    assert!(!last.has_more);
    assert_eq!(last.messages[0].content, "msg 0");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn search_matches_substrings_case_insensitively() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));
    let chat = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();

    let needle = Uuid::new_v4().simple().to_string();
    MessageService::append(
        &pool,
        &draft(&chat.id, &format!("Hello {}", needle.to_uppercase()), None),
        &a,
    )
    .await
    .unwrap();
    MessageService::append(&pool, &draft(&chat.id, "unrelated", None), &a)
        .await
        .unwrap();

    let scoped = MessageService::search(&pool, &needle, Some(&chat.id), 0, 20)
        .await
        .unwrap();
    assert_eq!(scoped.total, 1);

    let global = MessageService::search(&pool, &needle, None, 0, 20)
        .await
        .unwrap();
    assert_eq!(global.total, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn react_keeps_one_entry_per_participant() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));
    let chat = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();
    let msg = MessageService::append(&pool, &draft(&chat.id, "hi", None), &a)
        .await
        .unwrap();

    MessageService::react(&pool, msg.id, &a, Some("Alice"), "👍")
        .await
        .unwrap();
    let updated = MessageService::react(&pool, msg.id, &a, Some("Alice"), "🔥")
        .await
        .unwrap();

    assert_eq!(updated.reactions.len(), 1);
    assert_eq!(updated.reactions[&a].emoji, "🔥");

    let both = MessageService::react(&pool, msg.id, &b, None, "👍")
        .await
        .unwrap();
    assert_eq!(both.reactions.len(), 2);

    let err = MessageService::react(&pool, msg.id, &a, None, "").await;
    assert!(matches!(err, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn mark_read_only_transitions_for_the_declared_receiver() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));
    let chat = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();
    let msg = MessageService::append(&pool, &draft(&chat.id, "hi", Some(&b)), &a)
        .await
        .unwrap();
    assert_eq!(msg.status, MessageStatus::Sent);

    // the sender is not the receiver: silent no-op
    let noop = MessageService::mark_read(&pool, msg.id, &a).await.unwrap();
    assert!(noop.is_none());

    let read = MessageService::mark_read(&pool, msg.id, &b).await.unwrap();
    assert_eq!(read.unwrap().status, MessageStatus::Read);

    // second attempt: already read, no transition
    let again = MessageService::mark_read(&pool, msg.id, &b).await.unwrap();
    assert!(again.is_none());

    let missing = MessageService::mark_read(&pool, Uuid::new_v4(), &b).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn edit_and_delete_are_sender_only() {
    let pool = test_pool().await;
    let (a, b) = (participant("a"), participant("b"));
    let chat = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();
    let msg = MessageService::append(&pool, &draft(&chat.id, "original", None), &a)
        .await
        .unwrap();

    let err = MessageService::edit_content(&pool, msg.id, "hacked", &b).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));

    let edited = MessageService::edit_content(&pool, msg.id, "fixed", &a)
        .await
        .unwrap();
    assert_eq!(edited.content, "fixed");
    assert!(edited.edited_at.is_some());

    let err = MessageService::delete(&pool, msg.id, &b).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));
    MessageService::delete(&pool, msg.id, &a).await.unwrap();

    let gone = MessageService::delete(&pool, msg.id, &a).await;
    assert!(matches!(gone, Err(AppError::NotFound)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn group_authorization_matrix() {
    let pool = test_pool().await;
    let (owner, member, outsider) = (participant("o"), participant("m"), participant("x"));

    let group = ChatService::create_group(
        &pool,
        &owner,
        "team",
        Some("a group"),
        None,
        &[member.clone()],
    )
    .await
    .unwrap();
    assert_eq!(group.owner_id.as_deref(), Some(owner.as_str()));
    assert_eq!(group.participants.len(), 2);

    // outsider cannot add themselves
    let err = ChatService::add_member(&pool, &group.id, &outsider, &outsider).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));

    // an existing member can add
    let with_outsider = ChatService::add_member(&pool, &group.id, &outsider, &member)
        .await
        .unwrap();
    assert!(with_outsider.is_participant(&outsider));

    // a member cannot remove someone else
    let err = ChatService::remove_member(&pool, &group.id, &outsider, &member).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));

    // but may remove themself
    let without_member = ChatService::remove_member(&pool, &group.id, &member, &member)
        .await
        .unwrap();
    assert!(!without_member.is_participant(&member));

    // metadata and deletion are owner-only
    let err =
        ChatService::update_metadata(&pool, &group.id, &outsider, Some("hijack"), None, None).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));

    let err = ChatService::delete_group(&pool, &group.id, &outsider).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));
    ChatService::delete_group(&pool, &group.id, &owner).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn append_requires_existing_chat_and_membership() {
    let pool = test_pool().await;
    let (a, b, outsider) = (participant("a"), participant("b"), participant("x"));

    let missing = MessageService::append(&pool, &draft("direct_nope_nope2", "hi", None), &a).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let chat = ChatService::create_or_get_direct(&pool, &a, &b).await.unwrap();
    let err = MessageService::append(&pool, &draft(&chat.id, "hi", None), &outsider).await;
    assert!(matches!(err, Err(AppError::Unauthorized)));

    let before = ChatService::get(&pool, &chat.id).await.unwrap().last_activity;
    MessageService::append(&pool, &draft(&chat.id, "hi", None), &a)
        .await
        .unwrap();
    let after = ChatService::get(&pool, &chat.id).await.unwrap().last_activity;
    assert!(after > before);
}
