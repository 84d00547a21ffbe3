//! Feed session lifecycle.
//!
//! A [`FeedSession`] ties the HTTP bootstrap, the PIN state machine and the
//! realtime channel together behind explicit `start`/`stop` calls, with no
//! coupling to any rendering framework. Consumers drive it and observe a
//! stream of [`SessionEvent`]s.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::protocol::{ChannelMessage, FeedItem};
use crate::sync;

pub mod channel;
use channel::{ChannelEvent, FeedChannel};

/// Tri-state authentication status. `Unknown` holds until the first
/// exchange/fetch resolves; `Authenticated` never reverts within a session
/// except through a terminal channel closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// What a rendering layer needs to know, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// Authentication status resolved or changed.
    Auth(AuthStatus),
    /// The reconciled item list after a change, newest first.
    Items(Vec<FeedItem>),
    /// The realtime channel is up and subscribed.
    Connected,
    /// The channel dropped; it reconnects on its own. Status display only.
    Disconnected,
    /// Terminal closure: session state is discarded and the consumer should
    /// navigate back home.
    Ended,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The server accepted the fetch but granted no session secret.
    #[error("feed returned no session secret")]
    MissingSecret,
}

/// One viewing session of one feed.
pub struct FeedSession {
    api: ApiClient,
    feed: String,
    secret: Arc<RwLock<String>>,
    status: AuthStatus,
    vapid_public_key: Option<String>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    channel: Option<FeedChannel>,
    pump: Option<JoinHandle<()>>,
}

impl FeedSession {
    pub fn new(
        api: ApiClient,
        feed: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            api,
            feed: feed.into(),
            secret: Arc::new(RwLock::new(String::new())),
            status: AuthStatus::Unknown,
            vapid_public_key: None,
            events_tx,
            channel: None,
            pump: None,
        };
        (session, events_rx)
    }

    pub fn feed_name(&self) -> &str {
        &self.feed
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    /// Push-notification server key, once a snapshot carried one.
    pub fn vapid_public_key(&self) -> Option<&str> {
        self.vapid_public_key.as_deref()
    }

    /// The currently held session secret (empty until authenticated). The
    /// server may rotate it through channel snapshots at any time.
    pub async fn current_secret(&self) -> String {
        self.secret.read().await.clone()
    }

    /// Bootstrap the session and resolve the authentication status.
    ///
    /// A secret carried in the shared link (`url_secret`) is exchanged
    /// first and its outcome always takes precedence; only afterwards does
    /// the plain snapshot fetch run, so a 401 from the latter can never
    /// shadow a successful exchange. Returns `Unauthenticated` when a PIN
    /// is required; any other failure is fatal to the session.
    pub async fn start(&mut self, url_secret: Option<&str>) -> Result<AuthStatus, SessionError> {
        if let Some(candidate) = url_secret {
            match self.api.authenticate_feed(&self.feed, candidate).await {
                Ok(secret) => {
                    self.on_authenticated(secret).await;
                    return Ok(self.status);
                }
                Err(err) => {
                    debug!(feed = %self.feed, error = %err, "link secret rejected, falling back");
                }
            }
        }

        match self.api.get_feed(&self.feed, None).await {
            Ok(feed) => {
                let secret = feed
                    .session_secret()
                    .map(str::to_owned)
                    .ok_or(SessionError::MissingSecret)?;
                *self.secret.write().await = secret;
                self.status = AuthStatus::Authenticated;
                self.vapid_public_key = feed.vapid_public_key.clone();
                let _ = self
                    .events_tx
                    .send(SessionEvent::Auth(AuthStatus::Authenticated));
                let _ = self.events_tx.send(SessionEvent::Items(feed.items.clone()));
                self.open_channel(feed.items);
                Ok(self.status)
            }
            Err(ApiError::Unauthorized) => {
                self.status = AuthStatus::Unauthenticated;
                let _ = self
                    .events_tx
                    .send(SessionEvent::Auth(AuthStatus::Unauthenticated));
                Ok(self.status)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Exchange a user-entered PIN for a session secret. On success the
    /// session flips to `Authenticated` and the channel starts connecting;
    /// on failure it stays `Unauthenticated` and the caller may retry.
    pub async fn submit_pin(&mut self, pin: &str) -> Result<(), SessionError> {
        let secret = self.api.authenticate_feed(&self.feed, pin).await?;
        self.on_authenticated(secret).await;
        Ok(())
    }

    async fn on_authenticated(&mut self, secret: String) {
        *self.secret.write().await = secret;
        self.status = AuthStatus::Authenticated;
        let _ = self
            .events_tx
            .send(SessionEvent::Auth(AuthStatus::Authenticated));

        // Seed the list over HTTP so consumers render before the channel's
        // first snapshot lands. A failure here is not fatal: the channel
        // delivers the same state moments later.
        let held = self.secret.read().await.clone();
        let initial = match self.api.get_feed(&self.feed, Some(&held)).await {
            Ok(feed) => {
                self.vapid_public_key = feed.vapid_public_key.clone();
                let _ = self.events_tx.send(SessionEvent::Items(feed.items.clone()));
                feed.items
            }
            Err(err) => {
                warn!(feed = %self.feed, error = %err, "snapshot seed failed, relying on channel");
                Vec::new()
            }
        };
        self.open_channel(initial);
    }

    fn open_channel(&mut self, initial_items: Vec<FeedItem>) {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let channel = FeedChannel::open(
            self.api.clone(),
            self.feed.clone(),
            self.secret.clone(),
            channel_tx,
        );
        self.channel = Some(channel);
        self.pump = Some(tokio::spawn(pump_events(
            channel_rx,
            self.events_tx.clone(),
            self.secret.clone(),
            initial_items,
        )));
    }

    /// Tear the session down: channel first (so no reconnect can fire), then
    /// the event pump. Safe to call on a session that never started.
    pub async fn stop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.stop().await;
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
        }
    }
}

/// Turns channel events into session events, owning the reconciled list and
/// applying the push-transport merge policy. Exits on terminal closure,
/// discarding session state first.
async fn pump_events(
    mut channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    events: mpsc::UnboundedSender<SessionEvent>,
    secret: Arc<RwLock<String>>,
    mut items: Vec<FeedItem>,
) {
    while let Some(event) = channel_rx.recv().await {
        match event {
            ChannelEvent::Open => {
                let _ = events.send(SessionEvent::Connected);
            }
            ChannelEvent::Message(ChannelMessage::Snapshot(snapshot)) => {
                if let Some(rotated) = snapshot.session_secret() {
                    let mut held = secret.write().await;
                    if *held != rotated {
                        debug!("feed secret rotated");
                        *held = rotated.to_owned();
                    }
                }
                if sync::apply_snapshot(&mut items, snapshot.items) {
                    let _ = events.send(SessionEvent::Items(items.clone()));
                }
            }
            ChannelEvent::Message(ChannelMessage::Delta(delta)) => {
                if sync::apply_delta(&mut items, delta) {
                    let _ = events.send(SessionEvent::Items(items.clone()));
                }
            }
            ChannelEvent::Closed { code } => {
                debug!(?code, "channel interrupted");
                let _ = events.send(SessionEvent::Disconnected);
            }
            ChannelEvent::Terminal { code } => {
                debug!(code, "session ended by server");
                items.clear();
                secret.write().await.clear();
                let _ = events.send(SessionEvent::Ended);
                return;
            }
        }
    }
}
