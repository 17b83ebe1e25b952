// src/server/livereload.rs

//! Live-reload channel between the rebuild loop and connected browsers.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::ServerState;

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Sent once when a browser connects.
    Connected,
    /// Full page reload.
    Reload,
    /// Re-fetch stylesheets without reloading the page.
    InjectCss,
}

/// Hub broadcasting [`ReloadMessage`]s to every connected client.
#[derive(Debug, Clone)]
pub struct LiveReload {
    sender: broadcast::Sender<ReloadMessage>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open.
        let receivers = self.sender.send(msg.clone()).unwrap_or(0);
        debug!(?msg, receivers, "live-reload message sent");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser side of the channel, served at `/__livereload.js`.
pub const CLIENT_SCRIPT: &str = r#"(function () {
  'use strict';
  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var attempts = 0;

  function refreshStyles() {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    links.forEach(function (link) {
      var url = new URL(link.href);
      url.searchParams.set('livereload', Date.now().toString());
      link.href = url.toString();
    });
  }

  function connect() {
    var ws = new WebSocket(scheme + location.host + '/__livereload');
    ws.onopen = function () { attempts = 0; };
    ws.onmessage = function (event) {
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {
        location.reload();
      } else if (msg.type === 'inject_css') {
        refreshStyles();
      }
    };
    ws.onclose = function () {
      if (attempts < 10) {
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }
    };
  }

  connect();
})();
"#;

pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// What woke the socket task up.
enum Wake {
    Browser(Option<Result<Message, axum::Error>>),
    Hub(Result<ReloadMessage, broadcast::error::RecvError>),
}

async fn handle_socket(mut socket: WebSocket, hub: LiveReload) {
    let mut rx = hub.subscribe();

    if send_json(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        // Reading the socket notices closed tabs without waiting for the
        // next reload.
        let wake = tokio::select! {
            incoming = socket.recv() => Wake::Browser(incoming),
            msg = rx.recv() => Wake::Hub(msg),
        };

        let sent = match wake {
            Wake::Browser(None | Some(Err(_)) | Some(Ok(Message::Close(_)))) => {
                debug!("live-reload client disconnected");
                break;
            }
            Wake::Browser(Some(Ok(_))) => continue,
            Wake::Hub(Ok(msg)) => send_json(&mut socket, &msg).await,
            Wake::Hub(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(skipped, "live-reload client lagged; forcing reload");
                send_json(&mut socket, &ReloadMessage::Reload).await
            }
            Wake::Hub(Err(broadcast::error::RecvError::Closed)) => break,
        };
        if sent.is_err() {
            break;
        }
    }
}

async fn send_json(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

pub(super) async fn script_handler() -> impl IntoResponse {
    ([("content-type", "application/javascript")], CLIENT_SCRIPT)
}
