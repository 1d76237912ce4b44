//! Owned WebSocket connection with handshake, reconnect and backoff.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::message::{Inbound, RealtimeMessage};
use super::state::ConnectionState;
use super::RealtimeConfig;
use crate::BazaarError;
use crate::events::{BazaarEvent, dispatch};

const INBOUND_CAPACITY: usize = 256;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// State shared between the handle and its driver task.
struct Shared {
    config: RealtimeConfig,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    inbound: broadcast::Sender<Inbound>,
}

impl Shared {
    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Message>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn transition(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous == next {
            return;
        }
        log::info!(
            target: "bazaar::realtime",
            "msg=\"connection state changed\" from=\"{previous}\" to=\"{next}\""
        );
        dispatch(BazaarEvent::RealtimeStateChanged {
            from: previous.to_string(),
            to: next.to_string(),
            at: Utc::now(),
        })
        .await;
    }
}

struct Driver {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Handle to the single realtime connection.
///
/// Clones share the connection. The driver task stops once the last clone
/// is dropped.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
    driver: Arc<Mutex<Option<Driver>>>,
    root: CancellationToken,
    _shutdown: Arc<DropGuard>,
}

enum Disconnect {
    Cancelled,
    ClosedByPeer,
    Failed(String),
}

impl ConnectionManager {
    pub fn new(config: RealtimeConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Uninitialized);
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let root = CancellationToken::new();

        Self {
            shared: Arc::new(Shared {
                config,
                state,
                outbound: Mutex::new(None),
                inbound,
            }),
            driver: Arc::new(Mutex::new(None)),
            _shutdown: Arc::new(root.clone().drop_guard()),
            root,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Receiver for inbound messages. Slow receivers lose the oldest messages.
    pub fn subscribe(&self) -> broadcast::Receiver<Inbound> {
        self.shared.inbound.subscribe()
    }

    fn driver(&self) -> MutexGuard<'_, Option<Driver>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the connection in a background task.
    ///
    /// Must be called from within a Tokio runtime. Fails without side effects
    /// when no endpoint is configured or a connection is already active.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "realtime_initiate", skip_all, err))]
    pub fn initiate(&self) -> Result<(), BazaarError> {
        let Some(endpoint) = self.shared.config.resolved_endpoint().map(str::to_owned) else {
            log::error!(target: "bazaar::realtime", "msg=\"no realtime endpoint configured, not connecting\"");
            return Err(BazaarError::MissingEndpoint);
        };

        // held across the claim and the spawn so a concurrent close() always
        // finds the driver it has to stop
        let mut driver = self.driver();

        let mut claimed = false;
        self.shared.state.send_if_modified(|state| {
            if state.is_active() {
                false
            } else {
                *state = ConnectionState::Connecting;
                claimed = true;
                true
            }
        });
        if !claimed {
            log::warn!(target: "bazaar::realtime", "msg=\"initiate ignored, connection already active\"");
            return Err(BazaarError::AlreadyActive);
        }

        log::info!(target: "bazaar::realtime", "msg=\"connecting\" endpoint=\"{endpoint}\"");

        let cancel = self.root.child_token();
        let handle = tokio::spawn(drive(Arc::clone(&self.shared), endpoint, cancel.clone()));
        *driver = Some(Driver { cancel, handle });

        Ok(())
    }

    /// Sends a message if the connection is open.
    ///
    /// Returns `false`, with a warning, when the message was dropped.
    /// Nothing is queued for later delivery.
    pub fn send(&self, message: &RealtimeMessage) -> bool {
        let state = self.state();
        if !state.is_open() {
            log::warn!(
                target: "bazaar::realtime",
                "msg=\"send dropped, connection not open\" state=\"{state}\" type=\"{}\"",
                message.kind
            );
            return false;
        }

        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!(target: "bazaar::realtime", "msg=\"failed to encode message\" error=\"{e}\"");
                return false;
            }
        };

        match self.shared.outbound().as_ref() {
            Some(tx) => tx.send(Message::text(json)).is_ok(),
            None => {
                log::warn!(target: "bazaar::realtime", "msg=\"send dropped, no writer\"");
                false
            }
        }
    }

    /// Closes the connection and waits for the driver task to finish.
    pub async fn close(&self) {
        let driver = self.driver().take();
        match driver {
            Some(Driver { cancel, handle }) => {
                cancel.cancel();
                if let Err(e) = handle.await {
                    log::error!(target: "bazaar::realtime", "msg=\"driver task failed\" error=\"{e}\"");
                }
                self.shared.transition(ConnectionState::Closed).await;
            }
            None if self.state() != ConnectionState::Uninitialized => {
                self.shared.transition(ConnectionState::Closed).await;
            }
            None => {}
        }
    }
}

async fn drive(shared: Arc<Shared>, endpoint: String, cancel: CancellationToken) {
    let config = shared.config.clone();
    let mut attempt: u32 = 0;

    loop {
        let connect = tokio::time::timeout(config.connect_timeout, connect_async(endpoint.as_str()));
        let result = tokio::select! {
            () = cancel.cancelled() => {
                shared.transition(ConnectionState::Closed).await;
                return;
            }
            result = connect => result,
        };

        match result {
            Ok(Ok((socket, _response))) => {
                attempt = 0;
                let outcome = run_connection(&shared, socket, &cancel).await;
                *shared.outbound() = None;

                match outcome {
                    Disconnect::Cancelled => {
                        shared.transition(ConnectionState::Closed).await;
                        return;
                    }
                    Disconnect::ClosedByPeer => {
                        log::info!(target: "bazaar::realtime", "msg=\"connection closed by server\"");
                        if !config.reconnect {
                            shared.transition(ConnectionState::Closed).await;
                            return;
                        }
                    }
                    Disconnect::Failed(reason) => {
                        log::warn!(target: "bazaar::realtime", "msg=\"connection lost\" error=\"{reason}\"");
                        if !config.reconnect {
                            shared.transition(ConnectionState::Errored).await;
                            return;
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                log::warn!(target: "bazaar::realtime", "msg=\"connect failed\" attempt={attempt} error=\"{e}\"");
            }
            Err(_elapsed) => {
                log::warn!(
                    target: "bazaar::realtime",
                    "msg=\"connect timed out\" attempt={attempt} timeout_ms={}",
                    config.connect_timeout.as_millis()
                );
            }
        }

        if !config.reconnect || !config.backoff.can_retry(attempt) {
            log::error!(target: "bazaar::realtime", "msg=\"giving up on realtime connection\" retries={attempt}");
            shared.transition(ConnectionState::Errored).await;
            return;
        }

        let delay = config.backoff.calculate_delay(attempt);
        attempt += 1;
        shared
            .transition(ConnectionState::Reconnecting { attempt })
            .await;
        log::info!(
            target: "bazaar::realtime",
            "msg=\"reconnecting\" attempt={attempt} delay_ms={}",
            delay.as_millis()
        );

        tokio::select! {
            () = cancel.cancelled() => {
                shared.transition(ConnectionState::Closed).await;
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }

        shared.transition(ConnectionState::Connecting).await;
    }
}

async fn run_connection(shared: &Shared, socket: Socket, cancel: &CancellationToken) -> Disconnect {
    let (mut sink, mut stream) = socket.split();

    let handshake = match RealtimeMessage::client_connected().to_json() {
        Ok(json) => json,
        Err(e) => return Disconnect::Failed(e.to_string()),
    };
    if let Err(e) = sink.send(Message::text(handshake)).await {
        return Disconnect::Failed(format!("handshake failed: {e}"));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    *shared.outbound() = Some(tx);
    shared.transition(ConnectionState::Open).await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    log::debug!(target: "bazaar::realtime", "msg=\"close frame not sent\" error=\"{e}\"");
                }
                return Disconnect::Cancelled;
            }
            Some(message) = rx.recv() => {
                if let Err(e) = sink.send(message).await {
                    return Disconnect::Failed(e.to_string());
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => publish(shared, Inbound::parse(text.as_str())),
                Some(Ok(Message::Binary(bytes))) => {
                    publish(shared, Inbound::Raw(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    log::info!(target: "bazaar::realtime", "msg=\"close frame received\" frame=\"{frame:?}\"");
                    return Disconnect::ClosedByPeer;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Disconnect::Failed(e.to_string()),
                None => return Disconnect::Failed("stream ended without close frame".to_owned()),
            },
        }
    }
}

fn publish(shared: &Shared, inbound: Inbound) {
    match &inbound {
        Inbound::Json(value) => log::info!(
            target: "bazaar::realtime",
            "msg=\"message received\" type=\"{}\" body={value}",
            inbound.message_type().unwrap_or("-")
        ),
        Inbound::Raw(text) => log::info!(
            target: "bazaar::realtime",
            "msg=\"unparseable message received\" raw=\"{text}\""
        ),
    }
    // no subscribers is fine
    let _ = shared.inbound.send(inbound);
}
