//! Live connections addressable by user id.
//!
//! Each registered identity owns at most one outbound channel. Registering
//! again from a new socket replaces the older channel, and a socket that
//! closes only removes its own entry.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::extract::ws::Message;
use dispatch_core::events::{Notification, NotificationSink};
use dispatch_core::ride::UserId;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub type Outbound = UnboundedSender<Message>;

#[derive(Debug, Clone)]
struct Connection {
    conn_id: Uuid,
    tx: Outbound,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user` to the channel of connection `conn_id`. Returns the id of
    /// the connection it replaced, if any.
    pub fn register(&self, user: UserId, conn_id: Uuid, tx: Outbound) -> Option<Uuid> {
        let mut connections = match self.connections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        connections
            .insert(user, Connection { conn_id, tx })
            .map(|previous| previous.conn_id)
            .filter(|previous| *previous != conn_id)
    }

    /// Remove `user` if it is still bound to `conn_id`.
    pub fn unregister(&self, user: &UserId, conn_id: Uuid) -> bool {
        let mut connections = match self.connections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match connections.get(user) {
            Some(connection) if connection.conn_id == conn_id => {
                connections.remove(user);
                true
            }
            _ => false,
        }
    }

    pub fn is_connected(&self, user: &UserId) -> bool {
        self.read(|connections| connections.contains_key(user))
    }

    pub fn len(&self) -> usize {
        self.read(HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a text frame for `user`. False when the user has no live
    /// connection or its writer has gone away.
    pub fn send_text(&self, user: &UserId, text: String) -> bool {
        let tx = self.read(|connections| connections.get(user).map(|c| c.tx.clone()));
        match tx {
            Some(tx) => tx.send(Message::Text(text)).is_ok(),
            None => false,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&HashMap<UserId, Connection>) -> R) -> R {
        match self.connections.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

impl NotificationSink for ConnectionRegistry {
    fn deliver(&self, notification: Notification) -> bool {
        let text = match serde_json::to_string(&notification.event) {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(
                    %error,
                    event = notification.event.kind(),
                    "failed to serialize ride event"
                );
                return false;
            }
        };
        self.send_text(&notification.recipient, text)
    }
}
