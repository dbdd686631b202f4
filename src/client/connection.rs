//! Live data connection to the timing server
//!
//! `LiveConnection` is a shared handle around one background WebSocket
//! thread. Listeners register with `on_message` / `on_connection_change` and
//! get a `Subscription` back; the socket stays open while at least one
//! message listener is registered. `FeedChannel` bridges the listeners to the
//! UI thread through a bounded channel.

use std::net::TcpStream;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::CloseFrame;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use crate::core::backoff::ReconnectBackoff;
use crate::core::constants::{FEED_CHANNEL_CAPACITY, INTENTIONAL_CLOSE_REASON, SOCKET_POLL_INTERVAL};
use crate::core::io_traits::{ConnectionStatus, FeedEvent, FeedReceiver};
use crate::core::protocol::{parse_inbound, InboundMessage};

type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;
type StatusHandler = Arc<dyn Fn(ConnectionStatus, Option<&str>) + Send + Sync>;
type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

// =============================================================================
// SHARED STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Message,
    Status,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    message: Vec<(u64, MessageHandler)>,
    status: Vec<(u64, StatusHandler)>,
}

#[derive(Debug, Default)]
struct LinkState {
    status: ConnectionStatus,
    attempt: u32,
    last_message: Option<DateTime<Utc>>,
}

struct Worker {
    url: String,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // A listener running on the socket thread may trigger the stop itself
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        let _ = self.handle.join();
    }
}

struct Shared {
    auto_reconnect: bool,
    listeners: Mutex<Listeners>,
    link: Mutex<LinkState>,
    worker: Mutex<Option<Worker>>,
}

impl Shared {
    fn set_status(&self, status: ConnectionStatus, error: Option<&str>) {
        {
            let mut link = self.link.lock();
            if link.status == status && error.is_none() {
                return;
            }
            link.status = status;
        }

        let handlers: Vec<StatusHandler> = self
            .listeners
            .lock()
            .status
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(status, error))).is_err() {
                error!("[WS] Connection listener panicked");
            }
        }
    }

    fn set_attempt(&self, attempt: u32) {
        self.link.lock().attempt = attempt;
    }

    /// Parse one text frame and hand it to every message listener
    fn dispatch_text(&self, text: &str) {
        self.link.lock().last_message = Some(Utc::now());

        let message = match parse_inbound(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "[WS] Dropping malformed message");
                return;
            }
        };

        let handlers: Vec<MessageHandler> = self
            .listeners
            .lock()
            .message
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&message))).is_err() {
                error!(kind = message.kind(), "[WS] Message listener panicked");
            }
        }
    }

    fn stop_worker(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            info!(url = %worker.url, "[WS] Disconnecting");
            worker.stop();
        }
    }

    fn remove_listener(&self, kind: ListenerKind, id: u64) {
        let last_message_listener = {
            let mut listeners = self.listeners.lock();
            match kind {
                ListenerKind::Message => {
                    let before = listeners.message.len();
                    listeners.message.retain(|(i, _)| *i != id);
                    before > 0 && listeners.message.is_empty()
                }
                ListenerKind::Status => {
                    listeners.status.retain(|(i, _)| *i != id);
                    false
                }
            }
        };

        if last_message_listener {
            debug!("[WS] Last message listener removed, closing socket");
            self.stop_worker();
        }
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Listener registration; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    shared: Weak<Shared>,
    kind: ListenerKind,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now (same as dropping)
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_listener(self.kind, self.id);
        }
    }
}

// =============================================================================
// LIVE CONNECTION
// =============================================================================

/// Shared handle to the timing server link
#[derive(Clone)]
pub struct LiveConnection {
    shared: Arc<Shared>,
}

impl Default for LiveConnection {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LiveConnection {
    pub fn new(auto_reconnect: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                auto_reconnect,
                listeners: Mutex::new(Listeners::default()),
                link: Mutex::new(LinkState::default()),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Open the link; no-op while a link to the same URL is running
    pub fn connect(&self, url: &str) {
        let mut worker = self.shared.worker.lock();

        if let Some(running) = worker.as_ref() {
            if running.url == url && running.is_running() {
                debug!(url = %url, "[WS] Already connected");
                return;
            }
        }
        if let Some(old) = worker.take() {
            info!(from = %old.url, to = %url, "[WS] Switching server");
            old.stop();
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let shared = Arc::clone(&self.shared);
        let thread_url = url.to_string();

        let handle = thread::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                websocket_thread(&shared, &thread_url, &thread_shutdown);
            }));

            if let Err(panic_info) = result {
                let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    format!("WS thread panic: {}", s)
                } else {
                    "WS thread panic".to_string()
                };
                error!("{}", msg);
                shared.set_status(ConnectionStatus::Disconnected, Some(&msg));
            }
        });

        *worker = Some(Worker {
            url: url.to_string(),
            shutdown,
            handle,
        });
    }

    /// Close the link intentionally; never reconnects
    pub fn disconnect(&self) {
        self.shared.stop_worker();
    }

    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let mut listeners = self.shared.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.message.push((id, Arc::new(handler)));
        self.subscription(ListenerKind::Message, id)
    }

    pub fn on_connection_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(ConnectionStatus, Option<&str>) + Send + Sync + 'static,
    {
        let mut listeners = self.shared.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.status.push((id, Arc::new(handler)));
        self.subscription(ListenerKind::Status, id)
    }

    fn subscription(&self, kind: ListenerKind, id: u64) -> Subscription {
        Subscription {
            shared: Arc::downgrade(&self.shared),
            kind,
            id,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.link.lock().status
    }

    /// Failed or aborted attempts since the last successful open
    pub fn reconnect_attempt(&self) -> u32 {
        self.shared.link.lock().attempt
    }

    /// Arrival time of the last frame from the server
    pub fn last_message_time(&self) -> Option<DateTime<Utc>> {
        self.shared.link.lock().last_message
    }

    pub fn url(&self) -> Option<String> {
        self.shared.worker.lock().as_ref().map(|w| w.url.clone())
    }

    pub fn message_listener_count(&self) -> usize {
        self.shared.listeners.lock().message.len()
    }

    #[cfg(test)]
    pub(crate) fn inject_text(&self, text: &str) {
        self.shared.dispatch_text(text);
    }

    #[cfg(test)]
    pub(crate) fn inject_status(&self, status: ConnectionStatus, error: Option<&str>) {
        self.shared.set_status(status, error);
    }
}

// =============================================================================
// WEBSOCKET THREAD
// =============================================================================

fn websocket_thread(shared: &Shared, url: &str, shutdown: &AtomicBool) {
    let mut backoff = ReconnectBackoff::default();
    let mut first_attempt = true;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        info!(url = %url, attempt = backoff.attempt(), "[WS] Connecting...");
        let connecting = if first_attempt {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Reconnecting
        };
        first_attempt = false;
        shared.set_status(connecting, None);

        match connect(url) {
            Ok((mut socket, _)) => {
                info!("[WS] Connected");
                backoff.reset();
                shared.set_attempt(0);
                shared.set_status(ConnectionStatus::Connected, None);

                match message_loop(&mut socket, shared, shutdown) {
                    Ok(()) => {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: INTENTIONAL_CLOSE_REASON.into(),
                        };
                        let _ = socket.close(Some(frame));
                        let _ = socket.flush();
                        break;
                    }
                    Err(e) => {
                        info!(error = %e, "[WS] Disconnected");
                        let _ = socket.close(None);
                        shared.set_status(ConnectionStatus::Reconnecting, Some(&e));
                    }
                }
            }
            Err(e) => {
                let msg = format!("Connect failed: {}", e);
                warn!(error = %e, "[WS] Connection failed");
                shared.set_status(ConnectionStatus::Reconnecting, Some(&msg));
            }
        }

        if shutdown.load(Ordering::SeqCst) || !shared.auto_reconnect {
            break;
        }

        let delay = backoff.next_delay();
        shared.set_attempt(backoff.attempt());
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = backoff.attempt(),
            "[WS] Reconnecting..."
        );
        if sleep_unless_shutdown(delay, shutdown) {
            break;
        }
    }

    shared.set_status(ConnectionStatus::Disconnected, None);
}

/// Returns true if shutdown was requested during the wait
fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;
    while Instant::now() < deadline {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        thread::sleep(SOCKET_POLL_INTERVAL);
    }
    shutdown.load(Ordering::SeqCst)
}

/// Read frames until the link drops (`Err`) or shutdown is requested (`Ok`)
fn message_loop(socket: &mut Socket, shared: &Shared, shutdown: &AtomicBool) -> Result<(), String> {
    // Set non-blocking
    match socket.get_ref() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_nonblocking(true);
        }
        MaybeTlsStream::NativeTls(tls) => {
            let _ = tls.get_ref().set_nonblocking(true);
        }
        _ => {}
    }

    loop {
        if shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }

        match socket.read() {
            Ok(Message::Text(text)) => shared.dispatch_text(&text),
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                return Err(format!("Server closed ({})", reason));
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(SOCKET_POLL_INTERVAL);
            }
            Err(e) => return Err(format!("Read error: {}", e)),
        }
    }
}

// =============================================================================
// FEED CHANNEL
// =============================================================================

/// Forwards connection listeners to the UI thread
pub struct FeedChannel {
    rx: Receiver<FeedEvent>,
    status: ConnectionStatus,
    _messages: Subscription,
    _status: Subscription,
}

impl FeedChannel {
    pub fn attach(connection: &LiveConnection) -> Self {
        let (tx, rx) = bounded::<FeedEvent>(FEED_CHANNEL_CAPACITY);

        let message_tx = tx.clone();
        let messages = connection.on_message(move |message| {
            forward(&message_tx, FeedEvent::Message(message.clone()));
        });
        let status = connection.on_connection_change(move |status, error| {
            forward(
                &tx,
                FeedEvent::Status {
                    status,
                    error: error.map(str::to_string),
                },
            );
        });

        Self {
            rx,
            status: connection.status(),
            _messages: messages,
            _status: status,
        }
    }
}

fn forward(tx: &Sender<FeedEvent>, event: FeedEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("[WS] Feed channel full, dropping event"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

impl FeedReceiver for FeedChannel {
    fn poll_event(&mut self) -> Option<FeedEvent> {
        match self.rx.try_recv() {
            Ok(event) => {
                if let FeedEvent::Status { status, .. } = &event {
                    self.status = *status;
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.status = ConnectionStatus::Disconnected;
                None
            }
        }
    }

    fn status(&self) -> ConnectionStatus {
        self.status
    }
}

// =============================================================================
// TESTS
// =============================================================================
