//! WebSocket reachability probing.
//!
//! Grounded on the pack's `elisplash-paw` channel-bridge modules (e.g.
//! `slack.rs`, `discord.rs`, `mattermost.rs`), all of which open outbound
//! connections the same way: `tokio_tungstenite::connect_async(&url)`, then
//! immediately drop the stream once the handshake either succeeds or
//! errors. A watcher only needs the handshake outcome, not a live session.

use std::time::{Duration, Instant};

use tokio_tungstenite::connect_async;

pub struct WebsocketProbeOutcome {
    pub connected: bool,
    pub error: Option<String>,
    pub elapsed: Duration,
}

/// Attempt a WebSocket handshake against `url`, bounded by `timeout`.
/// Connection is closed immediately after a successful handshake — this is
/// a reachability check, not a session.
pub async fn probe(url: &str, timeout: Duration) -> WebsocketProbeOutcome {
    let start = Instant::now();
    let attempt = tokio::time::timeout(timeout, connect_async(url)).await;
    let elapsed = start.elapsed();

    match attempt {
        Ok(Ok((stream, _response))) => {
            drop(stream);
            WebsocketProbeOutcome {
                connected: true,
                error: None,
                elapsed,
            }
        }
        Ok(Err(e)) => WebsocketProbeOutcome {
            connected: false,
            error: Some(e.to_string()),
            elapsed,
        },
        Err(_) => WebsocketProbeOutcome {
            connected: false,
            error: Some("websocket handshake timed out".to_string()),
            elapsed,
        },
    }
}
