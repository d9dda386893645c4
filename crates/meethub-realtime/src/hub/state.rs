//! The hub state — all realtime business state behind one owner.
//!
//! `HubState` composes the presence registry, membership cache, unread
//! counters, and support desk. [`HubState::apply`] is the single
//! serialization point: it is synchronous, never awaits, and fully
//! commits each transition before returning the effects to execute.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;

use meethub_core::config::support::SupportConfig;
use meethub_core::types::id::{RoomId, TicketId, UserId};
use meethub_entity::message::Message;
use meethub_entity::room::Room;
use meethub_entity::ticket::{SupportTicket, TicketState};
use meethub_entity::user::UserRole;

use crate::connection::handle::ConnectionId;
use crate::message::types::{AdminProfile, ServerEvent, TicketCode};
use crate::presence::registry::PresenceRegistry;
use crate::rooms::membership::MembershipCache;
use crate::support::desk::SupportDesk;
use crate::unread::counters::UnreadCounters;

use super::command::HubCommand;
use super::effect::Effect;

/// Serialized owner of all realtime business state.
#[derive(Debug)]
pub struct HubState {
    /// Session → user presence.
    presence: PresenceRegistry,
    /// Attached rooms and online snapshots.
    rooms: MembershipCache,
    /// Unread counters.
    unread: UnreadCounters,
    /// Support ticket table.
    desk: SupportDesk,
    /// User ID → display name (cached from connections).
    usernames: HashMap<UserId, String>,
    /// Users known to hold the admin role.
    admins: HashSet<UserId>,
    /// Response window for assigned tickets.
    response_deadline: Duration,
}

impl HubState {
    /// Create an empty hub state.
    pub fn new(config: &SupportConfig) -> Self {
        Self {
            presence: PresenceRegistry::new(),
            rooms: MembershipCache::new(),
            unread: UnreadCounters::new(),
            desk: SupportDesk::new(),
            usernames: HashMap::new(),
            admins: HashSet::new(),
            response_deadline: Duration::from_secs(config.response_deadline_seconds),
        }
    }

    /// Apply one command and return the effects to execute.
    pub fn apply(&mut self, cmd: HubCommand) -> Vec<Effect> {
        match cmd {
            HubCommand::Connected {
                conn_id,
                user_id,
                username,
                role,
                rooms,
            } => self.on_connected(conn_id, user_id, username, role, rooms),
            HubCommand::Disconnected { conn_id } | HubCommand::ExplicitOffline { conn_id } => {
                self.on_disconnected(conn_id)
            }
            HubCommand::JoinRoom {
                conn_id,
                user_id,
                room_id,
                fetched,
            } => self.on_room_snapshot_request(conn_id, user_id, room_id, fetched),
            HubCommand::GetRoomOnlineMembers {
                conn_id,
                user_id,
                room_id,
                fetched,
            } => self.on_room_snapshot_request(conn_id, user_id, room_id, fetched),
            HubCommand::MarkRoomRead { room_id, user_id } => {
                self.on_mark_room_read(room_id, user_id)
            }
            HubCommand::GetUnreadCount {
                conn_id,
                room_id,
                user_id,
            } => vec![Effect::ToConn(
                conn_id,
                ServerEvent::UnreadCountUpdated {
                    room_id,
                    unread_count: self.unread.get(room_id, user_id),
                },
            )],
            HubCommand::MessageCreated {
                conn_id,
                message,
                fetched,
            } => self.on_message_created(conn_id, message, fetched),
            HubCommand::RequestSupport { user_id, username } => {
                self.on_request_support(user_id, username)
            }
            HubCommand::AdminJoinSupportRoom {
                conn_id,
                room_id,
                admin_id,
                admin_name,
            } => self.on_admin_join_support_room(conn_id, room_id, admin_id, admin_name),
            HubCommand::CloseSupportRoom {
                conn_id,
                room_id,
                closed_by,
            } => self.on_close_support_room(conn_id, room_id, closed_by),
            HubCommand::SupportDeadlineElapsed { ticket_id, token } => {
                self.on_deadline_elapsed(ticket_id, token)
            }
        }
    }

    // ── Presence ─────────────────────────────────────────────

    fn on_connected(
        &mut self,
        conn_id: ConnectionId,
        user_id: UserId,
        username: String,
        role: UserRole,
        rooms: Vec<Room>,
    ) -> Vec<Effect> {
        self.usernames.insert(user_id, username);
        if role.is_admin() {
            self.admins.insert(user_id);
        }

        let became_online = self.presence.register_session(conn_id, user_id);

        // Attach prefetched rooms the hub has not seen yet. Rooms the
        // hub already holds are authoritative (support membership may
        // be ahead of the write-behind store copy).
        for room in rooms {
            if !self.rooms.is_attached(room.id) && !room.is_deleted() {
                self.rooms.attach_room(room, &self.presence);
            }
        }

        let mut effects = Vec::new();
        if became_online {
            tracing::info!(user_id = %user_id, "User became online");
            for (room_id, snapshot) in self.rooms.on_user_online_changed(user_id, true) {
                effects.push(Effect::ToUsers(
                    snapshot.clone(),
                    ServerEvent::RoomOnlineMembers {
                        room_id,
                        online_member_ids: snapshot,
                    },
                ));
            }
        }
        effects
    }

    fn on_disconnected(&mut self, conn_id: ConnectionId) -> Vec<Effect> {
        // Duplicate disconnects are expected; unknown sessions are a no-op.
        let Some((user_id, became_offline)) = self.presence.unregister_session(conn_id) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        if became_offline {
            tracing::info!(user_id = %user_id, "User became offline");
            for (room_id, snapshot) in self.rooms.on_user_online_changed(user_id, false) {
                effects.push(Effect::ToUsers(
                    snapshot.clone(),
                    ServerEvent::RoomOnlineMembers {
                        room_id,
                        online_member_ids: snapshot,
                    },
                ));
            }
        }
        effects
    }

    // ── Rooms & unread ───────────────────────────────────────

    fn on_room_snapshot_request(
        &mut self,
        conn_id: ConnectionId,
        user_id: UserId,
        room_id: RoomId,
        fetched: Option<Room>,
    ) -> Vec<Effect> {
        let Some(room) = self.resolve_room(room_id, fetched) else {
            return vec![Effect::ToConn(conn_id, ServerEvent::not_found("Room"))];
        };

        if !room.is_member(user_id) {
            return vec![Effect::ToConn(conn_id, ServerEvent::not_a_member(room_id))];
        }

        let online_member_ids = self.rooms.online_members(room_id).unwrap_or_default();
        vec![Effect::ToConn(
            conn_id,
            ServerEvent::RoomOnlineMembers {
                room_id,
                online_member_ids,
            },
        )]
    }

    fn on_mark_room_read(&mut self, room_id: RoomId, user_id: UserId) -> Vec<Effect> {
        self.unread.reset(room_id, user_id);

        // All of the user's sessions reconcile to zero; online room
        // members get the read-ack broadcast.
        let mut effects = vec![Effect::ToUser(
            user_id,
            ServerEvent::UnreadCountUpdated {
                room_id,
                unread_count: 0,
            },
        )];
        if let Some(snapshot) = self.rooms.online_members(room_id) {
            effects.push(Effect::ToUsers(
                snapshot,
                ServerEvent::RoomMarkedRead { room_id, user_id },
            ));
        }
        effects
    }

    fn on_message_created(
        &mut self,
        conn_id: ConnectionId,
        message: Message,
        fetched: Option<Room>,
    ) -> Vec<Effect> {
        let room_id = message.room_id;
        let Some(mut room) = self.resolve_room(room_id, fetched) else {
            return vec![Effect::ToConn(conn_id, ServerEvent::not_found("Room"))];
        };

        if !room.is_member(message.sender_id) {
            return vec![Effect::ToConn(conn_id, ServerEvent::not_a_member(room_id))];
        }

        let mut effects = Vec::new();

        // Unread counters for every member except the author.
        for member_id in room.member_ids() {
            if member_id == message.sender_id {
                continue;
            }
            let unread_count = self.unread.increment(room_id, member_id);
            effects.push(Effect::ToUser(
                member_id,
                ServerEvent::UnreadCountUpdated {
                    room_id,
                    unread_count,
                },
            ));
        }

        // An assigned admin answering their support room makes the
        // ticket active and disarms the deadline.
        if let Some(ticket) = self.desk.ticket_for_room_mut(room_id) {
            if ticket.state == TicketState::Assigned && ticket.admin_id == Some(message.sender_id)
            {
                ticket.activate();
                tracing::info!(
                    ticket_id = %ticket.id,
                    admin_id = %message.sender_id,
                    "Support ticket active: admin responded"
                );
            }
        }

        room.touch_last_message(
            message.id,
            message.sender_id,
            &message.text,
            message.created_at,
        );
        self.rooms.attach_room(room.clone(), &self.presence);

        if let Some(snapshot) = self.rooms.online_members(room_id) {
            effects.push(Effect::ToUsers(
                snapshot,
                ServerEvent::NewMessage {
                    room_id,
                    message: message.clone(),
                },
            ));
        }

        effects.push(Effect::PersistMessage(message));
        effects.push(Effect::PersistRoom(room));
        effects
    }

    // ── Support assignment ───────────────────────────────────

    fn on_request_support(&mut self, user_id: UserId, username: String) -> Vec<Effect> {
        // Duplicate-request guard: one unresolved ticket per user.
        if let Some(existing) = self.desk.unresolved_for_user(user_id) {
            tracing::debug!(
                user_id = %user_id,
                room_id = %existing.room_id,
                "Duplicate support request"
            );
            return vec![Effect::ToUser(
                user_id,
                ServerEvent::SupportTicketAssigned {
                    room_id: existing.room_id,
                    user_id,
                    user_name: username,
                    code: Some(TicketCode::AssignAdminError),
                },
            )];
        }

        let mut room = Room::support(format!("Support: {username}"), user_id);
        let room_id = room.id;
        // A requester holding the admin role must not be handed their
        // own ticket.
        let online_admins: Vec<UserId> = self
            .online_admins()
            .into_iter()
            .filter(|id| *id != user_id)
            .collect();

        match self.desk.pick_admin(&online_admins, None) {
            Some(admin_id) => {
                room.set_support_admin(admin_id);

                let mut ticket = SupportTicket::pending(user_id, room_id);
                let deadline_at = Utc::now()
                    + chrono::Duration::seconds(self.response_deadline.as_secs() as i64);
                let token = ticket.assign(admin_id, deadline_at);
                let ticket_id = ticket.id;
                self.desk.insert(ticket);
                self.desk.note_assignment(admin_id);

                tracing::info!(
                    ticket_id = %ticket_id,
                    user_id = %user_id,
                    admin_id = %admin_id,
                    "Support ticket assigned"
                );

                let mut effects = self.reattach_and_broadcast(room.clone());
                effects.push(Effect::ToUser(
                    user_id,
                    ServerEvent::SupportRoomAssigned {
                        room_id,
                        admin: self.admin_profile(admin_id),
                    },
                ));
                effects.push(Effect::ToUser(
                    admin_id,
                    ServerEvent::SupportTicketAssigned {
                        room_id,
                        user_id,
                        user_name: username,
                        code: None,
                    },
                ));
                effects.push(Effect::ScheduleDeadline {
                    ticket_id,
                    token,
                    after: self.response_deadline,
                });
                effects.push(Effect::PersistRoom(room));
                effects
            }
            None => {
                let ticket = SupportTicket::pending(user_id, room_id);
                let ticket_id = ticket.id;
                self.desk.insert(ticket);

                tracing::info!(
                    ticket_id = %ticket_id,
                    user_id = %user_id,
                    "Support ticket pending: no admin online"
                );

                let mut effects = self.reattach_and_broadcast(room.clone());
                effects.push(Effect::ToUser(
                    user_id,
                    ServerEvent::SupportRoomPending { room_id },
                ));
                effects.push(Effect::ToUsers(
                    online_admins,
                    ServerEvent::SupportTicketAssigned {
                        room_id,
                        user_id,
                        user_name: username,
                        code: Some(TicketCode::PendingSupport),
                    },
                ));
                effects.push(Effect::PersistRoom(room));
                effects
            }
        }
    }

    fn on_admin_join_support_room(
        &mut self,
        conn_id: ConnectionId,
        room_id: RoomId,
        admin_id: UserId,
        admin_name: String,
    ) -> Vec<Effect> {
        let Some(ticket) = self.desk.ticket_for_room(room_id) else {
            return vec![Effect::ToConn(
                conn_id,
                ServerEvent::not_found("Support ticket"),
            )];
        };

        let (ticket_id, user_id) = (ticket.id, ticket.user_id);
        if ticket.state != TicketState::Pending {
            // Already claimed or active: point the admin at the
            // existing assignment instead of failing hard.
            return vec![Effect::ToConn(
                conn_id,
                ServerEvent::SupportTicketAssigned {
                    room_id,
                    user_id,
                    user_name: self.username_of(user_id),
                    code: Some(TicketCode::AssignAdminError),
                },
            )];
        }

        let deadline_at =
            Utc::now() + chrono::Duration::seconds(self.response_deadline.as_secs() as i64);
        let token = match self.desk.get_mut(ticket_id) {
            Some(ticket) => ticket.assign(admin_id, deadline_at),
            None => return Vec::new(),
        };
        self.desk.note_assignment(admin_id);

        tracing::info!(
            ticket_id = %ticket_id,
            admin_id = %admin_id,
            room_id = %room_id,
            "Pending support room claimed"
        );

        let mut effects = Vec::new();
        if let Some(mut room) = self.rooms.room(room_id).cloned() {
            room.set_support_admin(admin_id);
            effects.extend(self.reattach_and_broadcast(room.clone()));
            effects.push(Effect::PersistRoom(room));
        }
        effects.push(Effect::ToUser(
            user_id,
            ServerEvent::SupportAdminJoined {
                room_id,
                admin: AdminProfile {
                    id: admin_id,
                    username: admin_name,
                },
            },
        ));
        effects.push(Effect::ToUser(
            admin_id,
            ServerEvent::SupportTicketAssigned {
                room_id,
                user_id,
                user_name: self.username_of(user_id),
                code: None,
            },
        ));
        effects.push(Effect::ScheduleDeadline {
            ticket_id,
            token,
            after: self.response_deadline,
        });
        effects
    }

    fn on_close_support_room(
        &mut self,
        conn_id: ConnectionId,
        room_id: RoomId,
        closed_by: UserId,
    ) -> Vec<Effect> {
        let Some(ticket) = self.desk.ticket_for_room(room_id) else {
            return vec![Effect::ToConn(
                conn_id,
                ServerEvent::not_found("Support ticket"),
            )];
        };
        let ticket_id = ticket.id;

        let is_party = ticket.user_id == closed_by
            || ticket.admin_id == Some(closed_by)
            || self
                .rooms
                .room(room_id)
                .is_some_and(|r| r.is_member(closed_by));
        if !is_party {
            return vec![Effect::ToConn(conn_id, ServerEvent::not_a_member(room_id))];
        }

        if let Some(ticket) = self.desk.get_mut(ticket_id) {
            ticket.close();
        }
        self.desk.remove(ticket_id);

        tracing::info!(
            ticket_id = %ticket_id,
            room_id = %room_id,
            closed_by = %closed_by,
            "Support room closed"
        );

        let mut effects = Vec::new();
        if let Some(snapshot) = self.rooms.online_members(room_id) {
            effects.push(Effect::ToUsers(
                snapshot,
                ServerEvent::SupportRoomClosed { room_id, closed_by },
            ));
        }

        self.unread.purge_room(room_id);
        if let Some(mut room) = self.rooms.detach_room(room_id) {
            room.mark_deleted();
            effects.push(Effect::PersistRoom(room));
        }
        effects
    }

    fn on_deadline_elapsed(&mut self, ticket_id: TicketId, token: u64) -> Vec<Effect> {
        // The ticket may be gone (closed) or have moved on (admin
        // responded, earlier reassignment). Both are expected races,
        // absorbed here by the token guard.
        let Some(ticket) = self.desk.get_mut(ticket_id) else {
            tracing::debug!(ticket_id = %ticket_id, "Deadline for removed ticket ignored");
            return Vec::new();
        };
        if !ticket.deadline_is_current(token) {
            tracing::debug!(
                ticket_id = %ticket_id,
                token,
                "Stale deadline token ignored"
            );
            return Vec::new();
        }

        let old_admin = ticket.timed_out();
        let (user_id, room_id) = (ticket.user_id, ticket.room_id);

        let online_admins: Vec<UserId> = self
            .online_admins()
            .into_iter()
            .filter(|id| *id != user_id)
            .collect();
        let mut room = self.rooms.room(room_id).cloned();
        if let (Some(room), Some(old_admin)) = (room.as_mut(), old_admin) {
            room.remove_member(old_admin);
        }

        let mut effects = Vec::new();
        match self.desk.pick_admin(&online_admins, old_admin) {
            Some(new_admin) => {
                let deadline_at = Utc::now()
                    + chrono::Duration::seconds(self.response_deadline.as_secs() as i64);
                let new_token = match self.desk.get_mut(ticket_id) {
                    Some(ticket) => ticket.assign(new_admin, deadline_at),
                    None => return effects,
                };
                self.desk.note_assignment(new_admin);

                tracing::info!(
                    ticket_id = %ticket_id,
                    old_admin = ?old_admin,
                    new_admin = %new_admin,
                    "Support ticket reassigned after deadline"
                );

                if let Some(mut room) = room {
                    room.set_support_admin(new_admin);
                    effects.extend(self.reattach_and_broadcast(room.clone()));
                    effects.push(Effect::PersistRoom(room));
                }

                let changed = ServerEvent::SupportAdminChanged {
                    room_id,
                    user_id,
                    new_admin_id: Some(new_admin),
                };
                effects.push(Effect::ToUser(user_id, changed.clone()));
                if let Some(old_admin) = old_admin {
                    effects.push(Effect::ToUser(old_admin, changed));
                }
                effects.push(Effect::ToUser(
                    new_admin,
                    ServerEvent::SupportTicketAssigned {
                        room_id,
                        user_id,
                        user_name: self.username_of(user_id),
                        code: None,
                    },
                ));
                effects.push(Effect::ScheduleDeadline {
                    ticket_id,
                    token: new_token,
                    after: self.response_deadline,
                });
            }
            None => {
                tracing::info!(
                    ticket_id = %ticket_id,
                    old_admin = ?old_admin,
                    "Support ticket back to pending: no other admin online"
                );

                if let Some(room) = room {
                    effects.extend(self.reattach_and_broadcast(room.clone()));
                    effects.push(Effect::PersistRoom(room));
                }

                effects.push(Effect::ToUser(
                    user_id,
                    ServerEvent::SupportRoomPending { room_id },
                ));
                if let Some(old_admin) = old_admin {
                    effects.push(Effect::ToUser(
                        old_admin,
                        ServerEvent::SupportAdminChanged {
                            room_id,
                            user_id,
                            new_admin_id: None,
                        },
                    ));
                }
                effects.push(Effect::ToUsers(
                    online_admins,
                    ServerEvent::SupportTicketAssigned {
                        room_id,
                        user_id,
                        user_name: self.username_of(user_id),
                        code: Some(TicketCode::PendingSupport),
                    },
                ));
            }
        }
        effects
    }

    // ── Helpers ──────────────────────────────────────────────

    /// The hub's attached copy wins over the store's; the store copy is
    /// only used to attach a room the hub has not seen yet.
    fn resolve_room(&mut self, room_id: RoomId, fetched: Option<Room>) -> Option<Room> {
        if let Some(room) = self.rooms.room(room_id) {
            return Some(room.clone());
        }
        let room = fetched?;
        if room.is_deleted() {
            return None;
        }
        self.rooms.attach_room(room.clone(), &self.presence);
        Some(room)
    }

    /// Re-attach a room after a membership change and push the fresh
    /// snapshot to its online members.
    fn reattach_and_broadcast(&mut self, room: Room) -> Vec<Effect> {
        let room_id = room.id;
        self.rooms.attach_room(room, &self.presence);
        match self.rooms.online_members(room_id) {
            Some(snapshot) if !snapshot.is_empty() => vec![Effect::ToUsers(
                snapshot.clone(),
                ServerEvent::RoomOnlineMembers {
                    room_id,
                    online_member_ids: snapshot,
                },
            )],
            _ => Vec::new(),
        }
    }

    /// Online users holding the admin role, in stable order.
    fn online_admins(&self) -> Vec<UserId> {
        let mut admins: Vec<UserId> = self
            .presence
            .online_users()
            .filter(|id| self.admins.contains(id))
            .collect();
        admins.sort_unstable_by_key(|id| id.0);
        admins
    }

    fn username_of(&self, user_id: UserId) -> String {
        self.usernames
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn admin_profile(&self, admin_id: UserId) -> AdminProfile {
        AdminProfile {
            id: admin_id,
            username: self.username_of(admin_id),
        }
    }

    // ── Read accessors (queries and tests) ───────────────────

    /// Presence registry queries.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Membership cache queries.
    pub fn rooms(&self) -> &MembershipCache {
        &self.rooms
    }

    /// Unread counter queries.
    pub fn unread(&self) -> &UnreadCounters {
        &self.unread
    }

    /// Support desk queries.
    pub fn desk(&self) -> &SupportDesk {
        &self.desk
    }
}
