// File: ./src/hub.rs
// Who is watching which list, and fan-out of list updates to them.
use crate::model::{TodoList, WsMessage};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

struct Member {
    connection: u64,
    tx: UnboundedSender<String>,
}

type Room = HashMap<String, Member>;

/// One live connection's view of the hub.
#[derive(Debug)]
pub struct Subscription {
    pub connection: u64,
    pub receiver: UnboundedReceiver<String>,
}

pub struct Hub {
    enabled: bool,
    next_connection: AtomicU64,
    rooms: RwLock<HashMap<String, Room>>,
}

impl Hub {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            tracing::info!("websocket hub started");
        } else {
            tracing::info!("websocket hub disabled");
        }
        Self {
            enabled,
            next_connection: AtomicU64::new(1),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers `client_id` on `list_id`. A second subscription with the same
    /// client id replaces the first one.
    pub fn subscribe(&self, list_id: &str, client_id: &str) -> Option<Subscription> {
        if !self.enabled {
            return None;
        }
        let (tx, receiver) = unbounded_channel();
        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let mut rooms = self
            .rooms
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rooms
            .entry(list_id.to_string())
            .or_default()
            .insert(client_id.to_string(), Member { connection, tx });
        Some(Subscription {
            connection,
            receiver,
        })
    }

    /// Removes `client_id` unless it has since been re-subscribed by a newer
    /// connection.
    pub fn unsubscribe(&self, list_id: &str, client_id: &str, connection: u64) {
        let mut rooms = self
            .rooms
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(room) = rooms.get_mut(list_id) {
            if room
                .get(client_id)
                .is_some_and(|member| member.connection == connection)
            {
                room.remove(client_id);
            }
            if room.is_empty() {
                rooms.remove(list_id);
            }
        }
    }

    pub fn subscriber_count(&self, list_id: &str) -> usize {
        let rooms = self
            .rooms
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rooms.get(list_id).map_or(0, |room| room.len())
    }

    /// Sends the new list state to every subscriber except `updated_by`.
    /// Returns how many clients received it.
    pub fn broadcast(&self, list_id: &str, updated_by: &str, list: &TodoList) -> usize {
        if !self.enabled {
            return 0;
        }
        let payload = match serde_json::to_string(&WsMessage::update(list, updated_by)) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode websocket update");
                return 0;
            }
        };

        let mut rooms = self
            .rooms
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(room) = rooms.get_mut(list_id) else {
            return 0;
        };

        let mut delivered = 0;
        room.retain(|client_id, member| {
            if client_id == updated_by {
                return true;
            }
            if member.tx.send(payload.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::debug!(%client_id, "dropping closed websocket client");
                false
            }
        });
        if room.is_empty() {
            rooms.remove(list_id);
        }
        delivered
    }
}
