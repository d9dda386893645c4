//! Support assignment flows: pending, assignment, claims, deadline
//! reassignment, duplicate guards, and timer races.

use uuid::Uuid;

use meethub_core::config::support::SupportConfig;
use meethub_core::types::id::{RoomId, TicketId, UserId};
use meethub_entity::message::Message;
use meethub_entity::ticket::TicketState;
use meethub_entity::user::UserRole;
use meethub_realtime::connection::handle::ConnectionId;
use meethub_realtime::hub::{Effect, HubCommand, HubState};
use meethub_realtime::message::types::{ServerEvent, TicketCode};

fn hub() -> HubState {
    HubState::new(&SupportConfig::default())
}

fn connect(hub: &mut HubState, user_id: UserId, name: &str, role: UserRole) -> ConnectionId {
    let conn_id = Uuid::new_v4();
    hub.apply(HubCommand::Connected {
        conn_id,
        user_id,
        username: name.to_string(),
        role,
        rooms: Vec::new(),
    });
    conn_id
}

fn events_for_user(effects: &[Effect], user_id: UserId) -> Vec<ServerEvent> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::ToUser(id, event) if *id == user_id => Some(event.clone()),
            Effect::ToUsers(ids, event) if ids.contains(&user_id) => Some(event.clone()),
            _ => None,
        })
        .collect()
}

fn scheduled_deadline(effects: &[Effect]) -> Option<(TicketId, u64, std::time::Duration)> {
    effects.iter().find_map(|e| match e {
        Effect::ScheduleDeadline {
            ticket_id,
            token,
            after,
        } => Some((*ticket_id, *token, *after)),
        _ => None,
    })
}

fn assigned_room(effects: &[Effect], user_id: UserId) -> RoomId {
    events_for_user(effects, user_id)
        .iter()
        .find_map(|e| match e {
            ServerEvent::SupportRoomAssigned { room_id, .. } => Some(*room_id),
            _ => None,
        })
        .expect("support_room_assigned event")
}

/// Scenario A: no admin online.
#[test]
fn request_with_no_admin_online_goes_pending() {
    let mut hub = hub();
    let user = UserId::new();
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });

    let to_user = events_for_user(&effects, user);
    let room_id = to_user
        .iter()
        .find_map(|e| match e {
            ServerEvent::SupportRoomPending { room_id } => Some(*room_id),
            _ => None,
        })
        .expect("support_room_pending event");

    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Pending);
    assert_eq!(ticket.admin_id, None);
    assert!(scheduled_deadline(&effects).is_none());
}

/// Scenario B: admin X online.
#[test]
fn request_with_admin_online_assigns_and_arms_deadline() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    connect(&mut hub, admin, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });

    // User learns the assignment with the admin's identity.
    let room_id = assigned_room(&effects, user);
    let to_user = events_for_user(&effects, user);
    assert!(to_user.iter().any(|e| matches!(
        e,
        ServerEvent::SupportRoomAssigned { admin: a, .. } if a.id == admin && a.username == "xena"
    )));

    // Admin gets the ticket notice without an error code.
    let to_admin = events_for_user(&effects, admin);
    assert!(to_admin.iter().any(|e| matches!(
        e,
        ServerEvent::SupportTicketAssigned { room_id: rid, user_id: uid, code: None, .. }
            if *rid == room_id && *uid == user
    )));

    // 5-minute deadline armed.
    let (_, _, after) = scheduled_deadline(&effects).expect("deadline armed");
    assert_eq!(after.as_secs(), 300);

    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Assigned);
    assert_eq!(ticket.admin_id, Some(admin));

    // The support room now carries the admin as its designated admin.
    let room = hub.rooms().room(room_id).expect("room attached");
    assert_eq!(room.support_admin(), Some(admin));
}

/// P3: duplicate request while a ticket is unresolved.
#[test]
fn duplicate_request_returns_signal_not_second_ticket() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    connect(&mut hub, admin, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);
    assert_eq!(hub.desk().open_tickets(), 1);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });

    // No second ticket; the signal references the existing room.
    assert_eq!(hub.desk().open_tickets(), 1);
    let to_user = events_for_user(&effects, user);
    assert!(to_user.iter().any(|e| matches!(
        e,
        ServerEvent::SupportTicketAssigned { room_id: rid, code: Some(TicketCode::AssignAdminError), .. }
            if *rid == room_id
    )));
    assert!(scheduled_deadline(&effects).is_none());
}

/// Scenario C / P4: deadline elapses, another admin online.
#[test]
fn deadline_reassigns_to_different_admin() {
    let mut hub = hub();
    let (user, admin_x, admin_y) = (UserId::new(), UserId::new(), UserId::new());
    connect(&mut hub, admin_x, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);
    let (ticket_id, token, _) = scheduled_deadline(&effects).expect("deadline armed");

    // X never responds; Y is online by the time the deadline fires.
    connect(&mut hub, admin_y, "yuri", UserRole::Admin);
    let effects = hub.apply(HubCommand::SupportDeadlineElapsed { ticket_id, token });

    let to_user = events_for_user(&effects, user);
    assert!(to_user.iter().any(|e| matches!(
        e,
        ServerEvent::SupportAdminChanged { room_id: rid, new_admin_id: Some(na), .. }
            if *rid == room_id && *na == admin_y
    )));
    // The timed-out admin is told as well.
    assert!(events_for_user(&effects, admin_x)
        .iter()
        .any(|e| matches!(e, ServerEvent::SupportAdminChanged { .. })));
    // The new admin gets the ticket notice and a fresh deadline.
    assert!(events_for_user(&effects, admin_y)
        .iter()
        .any(|e| matches!(e, ServerEvent::SupportTicketAssigned { code: None, .. })));
    let (_, new_token, _) = scheduled_deadline(&effects).expect("new deadline armed");
    assert_ne!(new_token, token);

    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Assigned);
    assert_eq!(ticket.admin_id, Some(admin_y));

    // X is no longer associated with the room.
    let room = hub.rooms().room(room_id).expect("room");
    assert!(!room.is_member(admin_x));
    assert_eq!(room.support_admin(), Some(admin_y));
}

/// P4 fallback: deadline elapses with no other admin online.
#[test]
fn deadline_with_no_other_admin_falls_back_to_pending() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    connect(&mut hub, admin, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);
    let (ticket_id, token, _) = scheduled_deadline(&effects).expect("deadline armed");

    let effects = hub.apply(HubCommand::SupportDeadlineElapsed { ticket_id, token });

    // Never immediately re-assigned to the admin who timed out.
    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Pending);
    assert_eq!(ticket.admin_id, None);

    assert!(events_for_user(&effects, user)
        .iter()
        .any(|e| matches!(e, ServerEvent::SupportRoomPending { .. })));
    assert!(events_for_user(&effects, admin).iter().any(|e| matches!(
        e,
        ServerEvent::SupportAdminChanged { new_admin_id: None, .. }
    )));
    assert!(scheduled_deadline(&effects).is_none());
}

/// P5: admin response and deadline racing resolve to exactly one
/// transition.
#[test]
fn stale_deadline_after_admin_response_is_noop() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    let admin_conn = connect(&mut hub, admin, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);
    let (ticket_id, token, _) = scheduled_deadline(&effects).expect("deadline armed");

    // Admin responds first: ASSIGNED → ACTIVE.
    let message = Message::new(room_id, admin, "xena", "how can I help?");
    hub.apply(HubCommand::MessageCreated {
        conn_id: admin_conn,
        message,
        fetched: None,
    });
    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Active);

    // The queued deadline fires with its now-stale token: no effects,
    // no reassignment.
    let effects = hub.apply(HubCommand::SupportDeadlineElapsed { ticket_id, token });
    assert!(effects.is_empty());
    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Active);
    assert_eq!(ticket.admin_id, Some(admin));
}

/// The mirror race: deadline processed first, late response is a
/// no-op against the reassigned ticket.
#[test]
fn late_admin_message_after_reassignment_does_not_reactivate() {
    let mut hub = hub();
    let (user, admin_x, admin_y) = (UserId::new(), UserId::new(), UserId::new());
    let x_conn = connect(&mut hub, admin_x, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    // X is the only admin online, so X gets the ticket.
    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);
    let (ticket_id, token, _) = scheduled_deadline(&effects).expect("deadline armed");

    // Y comes online; the deadline hands the ticket to Y.
    connect(&mut hub, admin_y, "yuri", UserRole::Admin);
    hub.apply(HubCommand::SupportDeadlineElapsed { ticket_id, token });
    assert_eq!(
        hub.desk().ticket_for_room(room_id).and_then(|t| t.admin_id),
        Some(admin_y)
    );

    // X's late reply bounces: no longer a member, no state change.
    let message = Message::new(room_id, admin_x, "xena", "hello?");
    let effects = hub.apply(HubCommand::MessageCreated {
        conn_id: x_conn,
        message,
        fetched: None,
    });
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::ToConn(_, ServerEvent::Error { code, .. }) if code == "NOT_A_MEMBER"
    )));

    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Assigned);
    assert_eq!(ticket.admin_id, Some(admin_y));
}

#[test]
fn admin_claims_pending_room() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = events_for_user(&effects, user)
        .iter()
        .find_map(|e| match e {
            ServerEvent::SupportRoomPending { room_id } => Some(*room_id),
            _ => None,
        })
        .expect("pending room");

    // Admin comes online and claims it.
    let admin_conn = connect(&mut hub, admin, "xena", UserRole::Admin);
    let effects = hub.apply(HubCommand::AdminJoinSupportRoom {
        conn_id: admin_conn,
        room_id,
        admin_id: admin,
        admin_name: "xena".to_string(),
    });

    assert!(events_for_user(&effects, user).iter().any(|e| matches!(
        e,
        ServerEvent::SupportAdminJoined { admin: a, .. } if a.id == admin
    )));
    assert!(scheduled_deadline(&effects).is_some());

    let ticket = hub.desk().ticket_for_room(room_id).expect("ticket");
    assert_eq!(ticket.state, TicketState::Assigned);
    assert_eq!(ticket.admin_id, Some(admin));
}

#[test]
fn claiming_an_already_assigned_room_returns_duplicate_signal() {
    let mut hub = hub();
    let (user, admin_x, admin_y) = (UserId::new(), UserId::new(), UserId::new());
    connect(&mut hub, admin_x, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);

    let y_conn = connect(&mut hub, admin_y, "yuri", UserRole::Admin);
    let effects = hub.apply(HubCommand::AdminJoinSupportRoom {
        conn_id: y_conn,
        room_id,
        admin_id: admin_y,
        admin_name: "yuri".to_string(),
    });

    // Y is pointed at the existing assignment, X keeps the ticket.
    let to_conn: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::ToConn(id, event) if *id == y_conn => Some(event.clone()),
            _ => None,
        })
        .collect();
    assert!(to_conn.iter().any(|e| matches!(
        e,
        ServerEvent::SupportTicketAssigned { code: Some(TicketCode::AssignAdminError), .. }
    )));
    assert_eq!(
        hub.desk().ticket_for_room(room_id).and_then(|t| t.admin_id),
        Some(admin_x)
    );
}

#[test]
fn close_support_room_detaches_everything() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    let admin_conn = connect(&mut hub, admin, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let room_id = assigned_room(&effects, user);

    // A message builds up some unread state for the user.
    let message = Message::new(room_id, admin, "xena", "resolved!");
    hub.apply(HubCommand::MessageCreated {
        conn_id: admin_conn,
        message,
        fetched: None,
    });
    assert_eq!(hub.unread().get(room_id, user), 1);

    let effects = hub.apply(HubCommand::CloseSupportRoom {
        conn_id: admin_conn,
        room_id,
        closed_by: admin,
    });

    // Both parties see the close; state is fully detached.
    assert!(events_for_user(&effects, user).iter().any(|e| matches!(
        e,
        ServerEvent::SupportRoomClosed { closed_by, .. } if *closed_by == admin
    )));
    assert!(hub.desk().ticket_for_room(room_id).is_none());
    assert_eq!(hub.desk().open_tickets(), 0);
    assert!(hub.rooms().room(room_id).is_none());
    assert_eq!(hub.unread().get(room_id, user), 0);

    // The room is persisted soft-deleted.
    assert!(effects.iter().any(
        |e| matches!(e, Effect::PersistRoom(room) if room.id == room_id && room.is_deleted())
    ));

    // Closing again is a per-connection not-found, not a crash.
    let effects = hub.apply(HubCommand::CloseSupportRoom {
        conn_id: admin_conn,
        room_id,
        closed_by: admin,
    });
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::ToConn(_, ServerEvent::Error { code, .. }) if code == "NOT_FOUND"
    )));
}

#[test]
fn closed_ticket_allows_a_fresh_request() {
    let mut hub = hub();
    let (user, admin) = (UserId::new(), UserId::new());
    let admin_conn = connect(&mut hub, admin, "xena", UserRole::Admin);
    connect(&mut hub, user, "uma", UserRole::Member);

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let first_room = assigned_room(&effects, user);

    hub.apply(HubCommand::CloseSupportRoom {
        conn_id: admin_conn,
        room_id: first_room,
        closed_by: user,
    });

    let effects = hub.apply(HubCommand::RequestSupport {
        user_id: user,
        username: "uma".to_string(),
    });
    let second_room = assigned_room(&effects, user);
    assert_ne!(first_room, second_room);
    assert_eq!(hub.desk().open_tickets(), 1);
}
