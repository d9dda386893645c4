//! The hub — single serialization point for all realtime state.
//!
//! One tokio task owns [`HubState`] and drains a command mailbox one
//! command at a time, so the effects of each event are fully applied
//! before the next begins. Deadline timers are delayed commands fed
//! back into the same mailbox, never direct mutations.

pub mod command;
pub mod effect;
pub mod state;

pub use command::HubCommand;
pub use effect::Effect;
pub use state::HubState;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

use meethub_store::{MessageStore, RoomStore};

use crate::connection::manager::ConnectionManager;

/// Cloneable sender half of the hub mailbox.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Create a handle from a mailbox sender.
    pub fn new(tx: mpsc::Sender<HubCommand>) -> Self {
        Self { tx }
    }

    /// Enqueue a command for serialized processing.
    pub async fn send(&self, cmd: HubCommand) {
        if self.tx.send(cmd).await.is_err() {
            warn!("Hub mailbox closed, command dropped");
        }
    }
}

/// The hub task: drains the mailbox and executes effects.
pub struct Hub {
    state: HubState,
    rx: mpsc::Receiver<HubCommand>,
    /// Sender used by deadline sleepers to re-enter the mailbox.
    tx: mpsc::Sender<HubCommand>,
    connections: Arc<ConnectionManager>,
    rooms: Arc<dyn RoomStore>,
    messages: Arc<dyn MessageStore>,
}

impl Hub {
    /// Assemble the hub task.
    pub fn new(
        state: HubState,
        rx: mpsc::Receiver<HubCommand>,
        tx: mpsc::Sender<HubCommand>,
        connections: Arc<ConnectionManager>,
        rooms: Arc<dyn RoomStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            state,
            rx,
            tx,
            connections,
            rooms,
            messages,
        }
    }

    /// Run until the mailbox closes or shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    let effects = self.state.apply(cmd);
                    self.execute(effects);
                }
                _ = shutdown.recv() => break,
            }
        }
        debug!("Hub task exiting");
    }

    /// Execute the effects of a committed transition.
    ///
    /// Deliveries are non-blocking sends; timers and storage writes are
    /// spawned so the mailbox never waits on them.
    fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ToConn(conn_id, event) => {
                    self.connections.send_to_conn(&conn_id, event);
                }
                Effect::ToUser(user_id, event) => {
                    self.connections.send_to_user(&user_id, event);
                }
                Effect::ToUsers(user_ids, event) => {
                    self.connections.send_to_users(&user_ids, event);
                }
                Effect::ScheduleDeadline {
                    ticket_id,
                    token,
                    after,
                } => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx
                            .send(HubCommand::SupportDeadlineElapsed { ticket_id, token })
                            .await;
                    });
                }
                Effect::PersistRoom(room) => {
                    let store = Arc::clone(&self.rooms);
                    tokio::spawn(async move {
                        if let Err(e) = store.save(&room).await {
                            error!(room_id = %room.id, error = %e, "Failed to persist room");
                        }
                    });
                }
                Effect::PersistMessage(message) => {
                    let store = Arc::clone(&self.messages);
                    tokio::spawn(async move {
                        if let Err(e) = store.save(&message).await {
                            error!(
                                message_id = %message.id,
                                error = %e,
                                "Failed to persist message"
                            );
                        }
                    });
                }
            }
        }
    }
}
