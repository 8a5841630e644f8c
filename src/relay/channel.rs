use super::messages::{ClientFrame, ClientMessage};
use crate::error::{SessionError, SessionResult};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Producer side of the outbound queue
#[derive(Clone)]
struct Outbox {
    session_id: Arc<str>,
    tx: mpsc::UnboundedSender<ClientMessage>,
    pending: Arc<AtomicUsize>,
    warn_depth: usize,
}

impl Outbox {
    fn push(&self, message: ClientMessage) {
        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if self.warn_depth > 0 && depth % self.warn_depth == 0 {
            warn!(
                "Outbound queue for session {} holds {} undelivered messages",
                self.session_id, depth
            );
        }

        if self.tx.send(message).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            debug!(
                "Dropping message for session {}: relay already closed",
                self.session_id
            );
        }
    }
}

/// Bidirectional pump between event producers and one connected client.
///
/// Messages queue up from creation, before any client is attached. Once
/// attached, an outbound task drains the queue in FIFO order and an inbound
/// task answers client control frames. Either side stopping cancels the
/// other.
pub struct RelayChannel {
    outbox: Outbox,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<ClientMessage>>>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayChannel {
    pub fn new(session_id: &str, queue_warn_depth: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            outbox: Outbox {
                session_id: Arc::from(session_id),
                tx,
                pending: Arc::new(AtomicUsize::new(0)),
                warn_depth: queue_warn_depth,
            },
            outbound_rx: Mutex::new(Some(rx)),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.outbox.session_id
    }

    /// Queue a message for the client. Never blocks and never drops while
    /// the relay is open.
    pub fn enqueue(&self, message: ClientMessage) {
        self.outbox.push(message);
    }

    /// Messages queued but not yet handed to the client
    pub fn pending(&self) -> usize {
        self.outbox.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled when the relay stops, from either side
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start pumping between the queue and a client transport.
    ///
    /// `sink` receives serialized JSON messages; `inbound` yields the client's
    /// text frames and ends when the client disconnects.
    pub fn attach<S, R>(&self, sink: S, inbound: R) -> SessionResult<()>
    where
        S: Sink<String> + Send + 'static,
        S::Error: Display,
        R: Stream<Item = String> + Send + 'static,
    {
        if self.is_closed() {
            return Err(SessionError::ChannelClosed);
        }

        let rx = lock(&self.outbound_rx).take().ok_or_else(|| {
            SessionError::InvalidInput(format!(
                "Relay for session {} already has a client attached",
                self.session_id()
            ))
        })?;

        let outbound = tokio::spawn(pump_outbound(
            Arc::clone(&self.outbox.session_id),
            rx,
            sink,
            Arc::clone(&self.outbox.pending),
            self.shutdown.clone(),
        ));
        let inbound = tokio::spawn(pump_inbound(
            self.outbox.clone(),
            inbound,
            self.shutdown.clone(),
        ));

        lock(&self.tasks).extend([outbound, inbound]);
        info!("Relay attached for session {}", self.session_id());
        Ok(())
    }

    /// Stop both pumps and release the transport. Repeated calls are no-ops.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() && lock(&self.tasks).is_empty() {
            return;
        }
        self.shutdown.cancel();
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        lock(&self.outbound_rx).take();
        debug!("Relay for session {} shut down", self.session_id());
    }
}

impl Drop for RelayChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn deliver<S>(sink: &mut S, message: &ClientMessage) -> SessionResult<()>
where
    S: Sink<String> + Unpin,
    S::Error: Display,
{
    let text = serde_json::to_string(message)?;
    sink.send(text).await.map_err(|e| {
        debug!("Client sink rejected message: {}", e);
        SessionError::ChannelClosed
    })
}

async fn pump_outbound<S>(
    session_id: Arc<str>,
    mut rx: mpsc::UnboundedReceiver<ClientMessage>,
    sink: S,
    pending: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) where
    S: Sink<String>,
    S::Error: Display,
{
    tokio::pin!(sink);
    debug!("Outbound pump started for session {}", session_id);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            message = rx.recv() => {
                let Some(message) = message else { break };
                pending.fetch_sub(1, Ordering::SeqCst);
                match deliver(&mut sink, &message).await {
                    Ok(()) => {}
                    Err(SessionError::ChannelClosed) => {
                        info!("Client for session {} went away during delivery", session_id);
                        break;
                    }
                    Err(e) => warn!("Skipping undeliverable message for session {}: {}", session_id, e),
                }
            }
        }
    }

    shutdown.cancel();
    let _ = sink.close().await;
    debug!("Outbound pump stopped for session {}", session_id);
}

async fn pump_inbound<R>(outbox: Outbox, inbound: R, shutdown: CancellationToken)
where
    R: Stream<Item = String>,
{
    tokio::pin!(inbound);
    debug!("Inbound pump started for session {}", outbox.session_id);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            frame = inbound.next() => {
                let Some(text) = frame else {
                    info!("Client for session {} disconnected", outbox.session_id);
                    break;
                };
                match ClientFrame::parse(&text) {
                    Some(ClientFrame::Ping) => outbox.push(ClientMessage::Pong),
                    Some(ClientFrame::Unknown) => {}
                    None => debug!("Ignoring malformed client frame on session {}", outbox.session_id),
                }
            }
        }
    }

    shutdown.cancel();
    debug!("Inbound pump stopped for session {}", outbox.session_id);
}
