//! The realtime feed channel.
//!
//! One persistent WebSocket per session, keyed by feed name + secret. The
//! channel task dials, subscribes, forwards parsed pushes, and re-dials
//! after a fixed delay on recoverable closures. Close codes above
//! [`TERMINAL_CLOSE_THRESHOLD`] end the session instead: the server
//! deliberately hung up (feed deleted, secret revoked) and no reconnect is
//! attempted.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::protocol::{ChannelMessage, SUBSCRIBE_REQUEST, TERMINAL_CLOSE_THRESHOLD};

/// Delay before re-dialing after a recoverable closure. Fixed, no backoff,
/// no retry cap.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Events the channel reports to its session.
#[derive(Debug)]
pub enum ChannelEvent {
    /// Connected and subscribed; pushes follow.
    Open,
    /// A parsed server push.
    Message(ChannelMessage),
    /// Recoverable closure. The channel re-dials after [`RECONNECT_DELAY`];
    /// `code` is absent when the connection dropped without a close frame.
    Closed { code: Option<u16> },
    /// Terminal closure: the session is over and the task has exited.
    Terminal { code: u16 },
}

pub(crate) fn is_terminal_close(code: u16) -> bool {
    code > TERMINAL_CLOSE_THRESHOLD
}

/// Handle to the channel task. Dropping or stopping it detaches the task
/// before anything else happens, so a scheduled reconnect can never fire
/// after teardown.
pub struct FeedChannel {
    task: Option<tokio::task::JoinHandle<()>>,
}

impl FeedChannel {
    /// Spawn the connect/reconnect loop. `secret` is shared with the session
    /// so rotated secrets are picked up on the next dial.
    pub fn open(
        api: ApiClient,
        feed: String,
        secret: Arc<RwLock<String>>,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Self {
        let task = tokio::spawn(run_channel(api, feed, secret, events));
        Self { task: Some(task) }
    }

    /// Tear the channel down and wait for the task to finish.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for FeedChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// How one established connection ended.
enum ConnectionEnd {
    Recoverable(Option<u16>),
    Terminal(u16),
    /// The session dropped its receiver; stop without reporting.
    Detached,
}

async fn run_channel(
    api: ApiClient,
    feed: String,
    secret: Arc<RwLock<String>>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    loop {
        let url = {
            let held = secret.read().await;
            api.ws_url(&feed, &held)
        };
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                debug!(feed = %feed, "channel connected");
                match serve_connection(stream, &events).await {
                    ConnectionEnd::Terminal(code) => {
                        warn!(feed = %feed, code, "channel closed for good");
                        let _ = events.send(ChannelEvent::Terminal { code });
                        return;
                    }
                    ConnectionEnd::Recoverable(code) => {
                        debug!(feed = %feed, ?code, "channel closed, will reconnect");
                        if events.send(ChannelEvent::Closed { code }).is_err() {
                            return;
                        }
                    }
                    ConnectionEnd::Detached => return,
                }
            }
            Err(err) => {
                debug!(feed = %feed, error = %err, "channel dial failed, will reconnect");
                if events.send(ChannelEvent::Closed { code: None }).is_err() {
                    return;
                }
            }
        }
        sleep(RECONNECT_DELAY).await;
    }
}

async fn serve_connection(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> ConnectionEnd {
    let (mut sink, mut messages) = stream.split();

    // Subscribe immediately so the server starts pushing this feed.
    if sink
        .send(Message::Text(SUBSCRIBE_REQUEST.to_owned()))
        .await
        .is_err()
    {
        return ConnectionEnd::Recoverable(None);
    }
    if events.send(ChannelEvent::Open).is_err() {
        return ConnectionEnd::Detached;
    }

    while let Some(frame) = messages.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ChannelMessage>(&text) {
                Ok(message) => {
                    if events.send(ChannelEvent::Message(message)).is_err() {
                        return ConnectionEnd::Detached;
                    }
                }
                // Unknown payload shapes are a forward-compatible no-op.
                Err(err) => debug!(error = %err, "ignoring unrecognized channel payload"),
            },
            Ok(Message::Close(close)) => {
                let code = close.map(|frame| u16::from(frame.code));
                return match code {
                    Some(code) if is_terminal_close(code) => ConnectionEnd::Terminal(code),
                    code => ConnectionEnd::Recoverable(code),
                };
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "channel read failed");
                return ConnectionEnd::Recoverable(None);
            }
        }
    }

    // Stream ended without a close frame; treat like an abnormal drop.
    ConnectionEnd::Recoverable(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_above_threshold_are_terminal() {
        assert!(is_terminal_close(4001));
        assert!(is_terminal_close(4010));
        assert!(!is_terminal_close(4000));
        assert!(!is_terminal_close(1006));
        assert!(!is_terminal_close(1000));
    }
}
