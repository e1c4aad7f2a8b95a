// File: ./src/client/watch.rs
// Keeping a shown list in step with the server, by polling or over a WebSocket.
use super::TodoApi;
use super::core::TodoClient;
use crate::config::ClientConfig;
use crate::model::{TodoList, WsData, WsKind, WsMessage};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Polling { interval: Duration },
    WebSocket { reconnect_delay: Duration },
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::Polling {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SyncMode {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        if cfg.enable_websocket {
            SyncMode::WebSocket {
                reconnect_delay: Duration::from_secs(cfg.reconnect_delay_secs.max(1)),
            }
        } else {
            SyncMode::Polling {
                interval: Duration::from_secs(cfg.poll_interval_secs.max(1)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Authoritative server state; replaces whatever is shown.
    Updated(TodoList),
    Connected { client_id: String },
    Disconnected,
    Error(String),
}

/// Owns the background loop; dropping it stops watching.
pub struct WatchHandle {
    editing: Arc<AtomicBool>,
    client_id: Arc<RwLock<Option<String>>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// While set, polling skips its fetches so an in-progress edit is not
    /// overwritten.
    pub fn set_editing(&self, editing: bool) {
        self.editing.store(editing, Ordering::SeqCst);
    }

    pub fn is_editing(&self) -> bool {
        self.editing.load(Ordering::SeqCst)
    }

    /// Client id the server knows this watcher by (WebSocket mode only).
    pub fn client_id(&self) -> Option<String> {
        self.client_id
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {}
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts watching `id` through `client`. In WebSocket mode `client_id` is
/// sent to the server so updates made under that id are not echoed back.
pub fn watch(
    client: Arc<TodoClient>,
    id: &str,
    client_id: Option<String>,
    mode: SyncMode,
    events: UnboundedSender<WatchEvent>,
) -> WatchHandle {
    match mode {
        SyncMode::Polling { interval } => watch_polling(client, id, interval, events),
        SyncMode::WebSocket { reconnect_delay } => {
            let editing = Arc::new(AtomicBool::new(false));
            let known_id = Arc::new(RwLock::new(client_id));
            let url_id = known_id.clone();
            let base = client.base_url().to_string();
            let list_id = id.to_string();
            let task = tokio::spawn(async move {
                socket_loop(base, list_id, url_id, reconnect_delay, events).await;
            });
            WatchHandle {
                editing,
                client_id: known_id,
                task,
            }
        }
    }
}

/// Polling against any backend. The first fetch happens one interval in.
pub fn watch_polling<A>(
    api: Arc<A>,
    id: &str,
    interval: Duration,
    events: UnboundedSender<WatchEvent>,
) -> WatchHandle
where
    A: TodoApi + 'static,
{
    let interval = interval.max(MIN_POLL_INTERVAL);
    let editing = Arc::new(AtomicBool::new(false));
    let flag = editing.clone();
    let id = id.to_string();
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        // A slow fetch pushes the next poll back instead of bunching them up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if flag.load(Ordering::SeqCst) {
                continue;
            }
            let event = match api.get(&id).await {
                Ok(list) => WatchEvent::Updated(list),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "poll failed");
                    WatchEvent::Error(e.to_string())
                }
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
    WatchHandle {
        editing,
        client_id: Arc::new(RwLock::new(None)),
        task,
    }
}

async fn socket_loop(
    base: String,
    list_id: String,
    client_id: Arc<RwLock<Option<String>>>,
    reconnect_delay: Duration,
    events: UnboundedSender<WatchEvent>,
) {
    loop {
        let known = client_id.read().ok().and_then(|c| c.clone());
        let url = super::core::ws_url(&base, &list_id, known.as_deref());
        match connect_async(url.as_str()).await {
            Ok((mut stream, _)) => {
                tracing::info!(%list_id, "websocket connected");
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            let Some(event) = handle_text(&text, &client_id) else {
                                continue;
                            };
                            if events.send(event).is_err() {
                                return;
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!(%list_id, error = %e, "websocket read error");
                            break;
                        }
                    }
                }
                if events.send(WatchEvent::Disconnected).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "websocket connect failed");
                if events.send(WatchEvent::Error(e.to_string())).is_err() {
                    return;
                }
            }
        }
        sleep(reconnect_delay).await;
    }
}

fn handle_text(text: &str, client_id: &RwLock<Option<String>>) -> Option<WatchEvent> {
    let msg: WsMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "skipping unparseable websocket message");
            return None;
        }
    };
    match (msg.kind, msg.data) {
        (WsKind::Connected, _) => {
            if let Ok(mut slot) = client_id.write() {
                *slot = Some(msg.client_id.clone());
            }
            Some(WatchEvent::Connected {
                client_id: msg.client_id,
            })
        }
        (WsKind::Update, WsData::List(list)) => Some(WatchEvent::Updated(list)),
        (WsKind::Update, WsData::Status { .. }) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_message_records_client_id() {
        let slot = RwLock::new(None);
        let text = serde_json::to_string(&WsMessage::connected("l1", "abc")).unwrap();
        assert_eq!(
            handle_text(&text, &slot),
            Some(WatchEvent::Connected {
                client_id: "abc".to_string()
            })
        );
        assert_eq!(slot.read().unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn garbage_frames_are_skipped() {
        let slot = RwLock::new(None);
        assert_eq!(handle_text("not json", &slot), None);
        assert_eq!(handle_text(r#"{"type":"update"}"#, &slot), None);
    }

    #[test]
    fn mode_follows_config() {
        let mut cfg = ClientConfig::default();
        assert_eq!(
            SyncMode::from_config(&cfg),
            SyncMode::Polling {
                interval: Duration::from_secs(5)
            }
        );
        cfg.enable_websocket = true;
        assert_eq!(
            SyncMode::from_config(&cfg),
            SyncMode::WebSocket {
                reconnect_delay: Duration::from_secs(2)
            }
        );
    }
}
