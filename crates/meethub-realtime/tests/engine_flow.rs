//! End-to-end engine flows over the real hub task and fan-out path,
//! with paused tokio time driving the response deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use meethub_auth::jwt::decoder::JwtDecoder;
use meethub_core::config::auth::AuthConfig;
use meethub_core::config::realtime::RealtimeConfig;
use meethub_core::config::support::SupportConfig;
use meethub_core::types::id::{SessionId, UserId};
use meethub_entity::room::{Room, RoomKind, RoomMember};
use meethub_entity::user::UserRole;
use meethub_realtime::RealtimeEngine;
use meethub_realtime::message::types::ServerEvent;
use meethub_store::MemoryStore;

fn engine_with_store() -> (Arc<RealtimeEngine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let decoder = Arc::new(JwtDecoder::new(&AuthConfig::default()));
    let engine = Arc::new(RealtimeEngine::new(
        RealtimeConfig::default(),
        SupportConfig::default(),
        decoder,
        store.clone(),
        store.clone(),
    ));
    (engine, store)
}

/// Receive events until one matches, bounded so a missing event fails
/// the test instead of hanging.
async fn wait_for<F>(rx: &mut mpsc::Receiver<ServerEvent>, pred: F) -> ServerEvent
where
    F: Fn(&ServerEvent) -> bool,
{
    for _ in 0..32 {
        let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
    panic!("expected event not delivered");
}

#[tokio::test(start_paused = true)]
async fn support_request_assignment_and_deadline_reassignment() {
    let (engine, _store) = engine_with_store();
    let (user, admin_x, admin_y) = (UserId::new(), UserId::new(), UserId::new());

    let (x_handle, mut x_rx) = engine
        .connections
        .register(admin_x, SessionId::new(), UserRole::Admin, "xena".into())
        .await;
    let (user_handle, mut user_rx) = engine
        .connections
        .register(user, SessionId::new(), UserRole::Member, "uma".into())
        .await;

    engine
        .connections
        .handle_inbound(&user_handle.id, r#"{"type":"user_request_support"}"#)
        .await;

    // User sees the assignment to X; X sees the ticket notice.
    let assigned = wait_for(&mut user_rx, |e| {
        matches!(e, ServerEvent::SupportRoomAssigned { .. })
    })
    .await;
    let ServerEvent::SupportRoomAssigned { room_id, admin } = assigned else {
        unreachable!()
    };
    assert_eq!(admin.id, admin_x);
    wait_for(&mut x_rx, |e| {
        matches!(e, ServerEvent::SupportTicketAssigned { code: None, .. })
    })
    .await;

    // Y comes online before the deadline elapses.
    let (_y_handle, mut y_rx) = engine
        .connections
        .register(admin_y, SessionId::new(), UserRole::Admin, "yuri".into())
        .await;

    // Let the 5-minute deadline fire.
    tokio::time::sleep(Duration::from_secs(301)).await;

    let changed = wait_for(&mut user_rx, |e| {
        matches!(e, ServerEvent::SupportAdminChanged { .. })
    })
    .await;
    let ServerEvent::SupportAdminChanged {
        room_id: changed_room,
        user_id: changed_user,
        new_admin_id,
    } = changed
    else {
        unreachable!()
    };
    assert_eq!(changed_room, room_id);
    assert_eq!(changed_user, user);
    assert_eq!(new_admin_id, Some(admin_y));

    // The new admin receives the handoff notice.
    wait_for(&mut y_rx, |e| {
        matches!(e, ServerEvent::SupportTicketAssigned { code: None, .. })
    })
    .await;

    // The old admin is told they were removed.
    wait_for(&mut x_rx, |e| {
        matches!(e, ServerEvent::SupportAdminChanged { .. })
    })
    .await;

    drop(x_handle);
}

#[tokio::test(start_paused = true)]
async fn admin_response_disarms_deadline() {
    let (engine, _store) = engine_with_store();
    let (user, admin) = (UserId::new(), UserId::new());

    let (admin_handle, mut admin_rx) = engine
        .connections
        .register(admin, SessionId::new(), UserRole::Admin, "xena".into())
        .await;
    let (user_handle, mut user_rx) = engine
        .connections
        .register(user, SessionId::new(), UserRole::Member, "uma".into())
        .await;

    engine
        .connections
        .handle_inbound(&user_handle.id, r#"{"type":"user_request_support"}"#)
        .await;
    let assigned = wait_for(&mut user_rx, |e| {
        matches!(e, ServerEvent::SupportRoomAssigned { .. })
    })
    .await;
    let ServerEvent::SupportRoomAssigned { room_id, .. } = assigned else {
        unreachable!()
    };
    wait_for(&mut admin_rx, |e| {
        matches!(e, ServerEvent::SupportTicketAssigned { .. })
    })
    .await;

    // Admin responds inside the window.
    let frame = format!(r#"{{"type":"send_message","roomId":"{room_id}","text":"hello"}}"#);
    engine
        .connections
        .handle_inbound(&admin_handle.id, &frame)
        .await;
    wait_for(&mut user_rx, |e| {
        matches!(e, ServerEvent::NewMessage { .. })
    })
    .await;

    // Well past the original deadline: no reassignment ever arrives.
    tokio::time::sleep(Duration::from_secs(600)).await;
    let mut leftover = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(50), user_rx.recv()).await
    {
        leftover.push(event);
    }
    assert!(
        leftover
            .iter()
            .all(|e| !matches!(e, ServerEvent::SupportAdminChanged { .. })),
        "deadline fired against an active ticket"
    );
}

#[tokio::test(start_paused = true)]
async fn join_message_and_mark_read_over_the_wire() {
    let (engine, store) = engine_with_store();
    let (a, b) = (UserId::new(), UserId::new());
    let room = Room::new(
        "kickoff",
        RoomKind::Group,
        vec![RoomMember::member(a), RoomMember::member(b)],
    );
    let room_id = room.id;
    store.insert_room(room);

    let (a_handle, mut a_rx) = engine
        .connections
        .register(a, SessionId::new(), UserRole::Member, "ada".into())
        .await;
    let (b_handle, mut b_rx) = engine
        .connections
        .register(b, SessionId::new(), UserRole::Member, "bea".into())
        .await;

    // A joins and gets the snapshot with both members online.
    let frame = format!(r#"{{"type":"join_room","roomId":"{room_id}"}}"#);
    engine.connections.handle_inbound(&a_handle.id, &frame).await;
    let snapshot = wait_for(&mut a_rx, |e| {
        matches!(e, ServerEvent::RoomOnlineMembers { .. })
    })
    .await;
    let ServerEvent::RoomOnlineMembers {
        online_member_ids, ..
    } = snapshot
    else {
        unreachable!()
    };
    assert_eq!(online_member_ids.len(), 2);

    // A sends a message; B's unread count goes to 1 and B receives it.
    let frame = format!(r#"{{"type":"send_message","roomId":"{room_id}","text":"hi"}}"#);
    engine.connections.handle_inbound(&a_handle.id, &frame).await;
    wait_for(&mut b_rx, |e| {
        matches!(e, ServerEvent::UnreadCountUpdated { unread_count: 1, .. })
    })
    .await;
    wait_for(&mut b_rx, |e| matches!(e, ServerEvent::NewMessage { .. })).await;

    // B marks the room read; both B's counter reset and the room-level
    // ack are observable.
    let frame = format!(r#"{{"type":"mark_room_read","roomId":"{room_id}"}}"#);
    engine.connections.handle_inbound(&b_handle.id, &frame).await;
    wait_for(&mut b_rx, |e| {
        matches!(e, ServerEvent::UnreadCountUpdated { unread_count: 0, .. })
    })
    .await;
    wait_for(&mut a_rx, |e| {
        matches!(e, ServerEvent::RoomMarkedRead { user_id, .. } if *user_id == b)
    })
    .await;

    // Counter query round-trip.
    let frame = format!(r#"{{"type":"get_unread_count","roomId":"{room_id}"}}"#);
    engine.connections.handle_inbound(&b_handle.id, &frame).await;
    wait_for(&mut b_rx, |e| {
        matches!(e, ServerEvent::UnreadCountUpdated { unread_count: 0, .. })
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_get_structured_errors() {
    let (engine, _store) = engine_with_store();
    let user = UserId::new();
    let (handle, mut rx) = engine
        .connections
        .register(user, SessionId::new(), UserRole::Member, "ada".into())
        .await;

    engine
        .connections
        .handle_inbound(&handle.id, r#"{"type":"join_room"}"#)
        .await;
    wait_for(&mut rx, |e| {
        matches!(e, ServerEvent::Error { code, .. } if code == "INVALID_MESSAGE")
    })
    .await;

    // Non-admins cannot claim support rooms.
    let frame = format!(
        r#"{{"type":"admin_join_support_room","roomId":"{}"}}"#,
        meethub_core::types::id::RoomId::new()
    );
    engine.connections.handle_inbound(&handle.id, &frame).await;
    wait_for(&mut rx, |e| {
        matches!(e, ServerEvent::Error { code, .. } if code == "FORBIDDEN")
    })
    .await;
}
