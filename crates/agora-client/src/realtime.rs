//! Realtime change feed
//!
//! WebSocket consumer for the backend's push-notification channel. Each
//! wire message names the collection a row changed in; nothing else is
//! consumed — the event is a pure invalidation signal handed to the sync
//! coordinator. Connection state is reported through a watch channel so
//! the runtime can force-refresh when connectivity comes back.

use agora_model::{ChangeEvent, Collection};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Realtime feed configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket URL of the change-notification channel
    pub ws_url: String,
    /// Delay before reconnecting after a dropped connection
    pub reconnect_delay: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8080/realtime/v1".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// One message off the wire. Only `table` is consumed.
#[derive(Debug, Deserialize)]
struct WireMessage {
    event: String,
    #[serde(default)]
    table: Option<String>,
}

/// Push-notification channel consumer.
pub struct RealtimeFeed {
    config: RealtimeConfig,
    events: mpsc::Sender<ChangeEvent>,
    connected: watch::Sender<bool>,
}

impl RealtimeFeed {
    /// Create a feed delivering change events into `events`. Returns the
    /// feed and a receiver tracking connection state (false until the
    /// first successful connect).
    pub fn new(
        config: RealtimeConfig,
        events: mpsc::Sender<ChangeEvent>,
    ) -> (Self, watch::Receiver<bool>) {
        let (connected, rx) = watch::channel(false);
        (
            Self {
                config,
                events,
                connected,
            },
            rx,
        )
    }

    /// Run the feed until the event receiver goes away, reconnecting with
    /// a fixed delay after every drop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.run_connection().await {
                    Ok(()) => info!("Realtime connection closed cleanly"),
                    Err(e) => warn!(error = %e, "Realtime connection lost"),
                }
                let _ = self.connected.send(false);

                if self.events.is_closed() {
                    debug!("Event receiver dropped, stopping realtime feed");
                    return;
                }
                tokio::time::sleep(self.config.reconnect_delay).await;
            }
        })
    }

    async fn run_connection(&self) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let (mut ws, _) = connect_async(self.config.ws_url.as_str()).await?;
        info!(url = %self.config.ws_url, "Realtime channel connected");

        // Subscribe to change events on every table.
        let subscribe = serde_json::json!({"event": "subscribe", "scope": "*"});
        ws.send(Message::Text(subscribe.to_string())).await?;
        let _ = self.connected.send(true);

        while let Some(msg) = ws.next().await {
            match msg? {
                Message::Text(text) => self.handle_text(&text).await,
                Message::Ping(data) => ws.send(Message::Pong(data)).await?,
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }

    async fn handle_text(&self, text: &str) {
        let wire: WireMessage = match serde_json::from_str(text) {
            Ok(w) => w,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable realtime message");
                return;
            }
        };

        if wire.event != "change" {
            return;
        }

        let Some(table) = wire.table else { return };
        let collection: Collection = match table.parse() {
            Ok(c) => c,
            Err(_) => {
                debug!(table = %table, "Change event for unknown collection, ignoring");
                return;
            }
        };

        debug!(collection = %collection, "Change event received");
        if self.events.send(ChangeEvent::new(collection)).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}
