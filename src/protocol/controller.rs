//! # Request Dispatcher
//!
//! The controller side of the protocol: packages validated commands into
//! messages, assigns correlation sequences, transmits over unconnected UDP,
//! and matches inbound responses back to their pending requests.
//!
//! Correlation is structural: every tracked request owns a oneshot
//! completion handle keyed by sequence in the pending table, so cancellation
//! and error propagation follow the request's own control flow instead of a
//! shared listener. Traffic that resolves no pending request (malformed
//! datagrams, duplicate or late responses) is surfaced on a broadcast event
//! channel and never fails an unrelated request.

use crate::config::ControllerConfig;
use crate::core::codec;
use crate::core::message::{Command, Message, Response};
use crate::error::{constants, ModuleError, Result};
use crate::protocol::sequence::{MonotonicSequence, RandomSequence, SequenceProvider};
use crate::utils::timeout::retry_delay;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Capacity of the observational event channel. Slow subscribers lose the
/// oldest events; request outcomes are never delivered this way.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Socket traffic that did not resolve a pending request.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A well-formed response arrived. Emitted for every decoded datagram,
    /// before correlation.
    Response {
        response: Response,
        source: SocketAddr,
    },
    /// A well-formed response matched no pending sequence and was dropped.
    Unmatched {
        sequence: Option<u32>,
        source: SocketAddr,
    },
    /// An inbound datagram failed to decode as a response.
    DecodeError { detail: String, source: SocketAddr },
}

type PendingTable = Arc<Mutex<HashMap<u32, oneshot::Sender<Response>>>>;

/// Controller for sending commands to module peers.
///
/// Single logical writer discipline: the pending table is touched only by
/// short critical sections in the send path, the receive task and `close`.
/// Any number of requests may be outstanding at once and complete in any
/// order.
pub struct Controller {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    config: ControllerConfig,
    sequences: Arc<dyn SequenceProvider>,
    pending: PendingTable,
    events: broadcast::Sender<ControllerEvent>,
    receiver: JoinHandle<()>,
    closed: AtomicBool,
}

impl Controller {
    /// Bind a local socket and start the receive task. `host` must be an
    /// IPv4 address; `port` must be non-zero.
    pub async fn connect(host: &str, port: u16, config: ControllerConfig) -> Result<Self> {
        let sequences: Arc<dyn SequenceProvider> = if config.sequence_tracking {
            Arc::new(MonotonicSequence::new())
        } else {
            Arc::new(RandomSequence)
        };
        Self::connect_with_sequences(host, port, config, sequences).await
    }

    /// Like [`Controller::connect`] but with a caller-supplied sequence
    /// provider, for deterministic tests and custom id schemes.
    pub async fn connect_with_sequences(
        host: &str,
        port: u16,
        config: ControllerConfig,
        sequences: Arc<dyn SequenceProvider>,
    ) -> Result<Self> {
        let ip: Ipv4Addr = host.parse().map_err(|_| {
            ModuleError::invalid("host", format!("not a valid IPv4 address: {host}"))
        })?;
        if port == 0 {
            return Err(ModuleError::invalid("port", "must be between 1 and 65535"));
        }

        let socket = Arc::new(UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?);
        let target = SocketAddr::from((ip, port));
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let receiver = spawn_receiver(Arc::clone(&socket), Arc::clone(&pending), events.clone());
        debug!(peer = %target, local = ?socket.local_addr(), "controller connected");

        Ok(Self {
            socket,
            target,
            config,
            sequences,
            pending,
            events,
            receiver,
            closed: AtomicBool::new(false),
        })
    }

    /// Send a single command and wait for its correlated response.
    ///
    /// Returns `Ok(Some(response))` on a 2xx reply, `Ok(None)` when sequence
    /// tracking is disabled (the send completes as soon as the datagram is
    /// out), and an error for validation failures, transport failures after
    /// exhausting retries, response timeout, or a non-2xx peer status.
    pub async fn send_command(&self, command: Command) -> Result<Option<Response>> {
        self.send_batch(vec![command]).await
    }

    /// Send several commands in one message. The batch shares one sequence
    /// and therefore one response.
    #[instrument(skip(self, commands), fields(peer = %self.target, count = commands.len()))]
    pub async fn send_batch(&self, commands: Vec<Command>) -> Result<Option<Response>> {
        if self.is_closed() {
            return Err(ModuleError::Closed);
        }

        let sequence = self.sequences.next();
        let message = Message::new(commands, Some(sequence));
        let payload = codec::encode_message(&message)?;

        // Register before transmitting so a reply that races the send call
        // still finds its pending entry.
        let completion = if self.config.sequence_tracking {
            Some(self.register_pending(sequence)?)
        } else {
            None
        };

        // close() drains the table after flipping the flag; an entry that
        // slipped in behind the drain must not sit out its full timeout.
        if self.is_closed() {
            self.remove_pending(sequence);
            return Err(ModuleError::Closed);
        }

        if let Err(error) = self.transmit(&payload).await {
            self.remove_pending(sequence);
            return Err(error);
        }
        debug!(sequence, bytes = payload.len(), "message sent");

        let Some(completion) = completion else {
            // Untracked: Sent is terminal, nothing will correlate.
            return Ok(None);
        };

        match tokio::time::timeout(self.config.response_timeout, completion).await {
            Err(_elapsed) => {
                self.remove_pending(sequence);
                Err(ModuleError::Timeout(
                    self.config.response_timeout.as_millis() as u64,
                ))
            }
            // Sender dropped without a response: the controller was closed.
            Ok(Err(_)) => Err(ModuleError::Closed),
            Ok(Ok(response)) => {
                if response.is_success() {
                    Ok(Some(response))
                } else {
                    Err(ModuleError::Application {
                        status: response.status,
                        message: response.message,
                    })
                }
            }
        }
    }

    /// Subscribe to observational socket events (decode failures, unmatched
    /// responses). Each subscriber gets an independent cursor.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Local address of the controller socket (useful for tests and
    /// diagnostics).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shut the controller down: stops the receive task and fails every
    /// pending request with [`ModuleError::Closed`]. Dropping each pending
    /// completion handle wakes its waiter immediately, so no timeout timers
    /// outlive the call. The controller is unusable afterwards.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.receiver.abort();

        if let Ok(mut pending) = self.pending.lock() {
            let abandoned = pending.len();
            pending.clear();
            if abandoned > 0 {
                debug!(requests = abandoned, "failed pending requests on close");
            }
        }
    }

    fn register_pending(&self, sequence: u32) -> Result<oneshot::Receiver<Response>> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| ModuleError::Internal(constants::ERR_PENDING_LOCK.to_string()))?;
        if pending.insert(sequence, tx).is_some() {
            warn!(sequence, "sequence collision among pending requests");
        }
        Ok(rx)
    }

    fn remove_pending(&self, sequence: u32) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&sequence);
        }
    }

    /// Transmit with bounded retry. Only transmission failures are retried;
    /// the delay before retry k is 100ms * 2^k.
    async fn transmit(&self, payload: &[u8]) -> Result<()> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.socket.send_to(payload, self.target).await {
                Ok(_) => {
                    if attempt > 0 {
                        debug!(attempt, "transmit succeeded after retry");
                    }
                    return Ok(());
                }
                Err(error) => {
                    warn!(attempt, %error, "transmit failed");
                    last_error = Some(error);
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(retry_delay(attempt)).await;
                    }
                }
            }
        }

        let detail = last_error.map_or_else(String::new, |e| e.to_string());
        Err(ModuleError::Connection(format!(
            "failed to transmit after {} attempts: {detail}",
            self.config.max_retries + 1
        )))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("target", &self.target)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Receive task: decodes every inbound datagram as a response and completes
/// the matching pending request, if any. Everything else becomes an event.
fn spawn_receiver(
    socket: Arc<UdpSocket>,
    pending: PendingTable,
    events: broadcast::Sender<ControllerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let (len, source) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(error) => {
                    warn!(%error, "receive failed");
                    continue;
                }
            };

            let response = match codec::decode_response(&buf[..len]) {
                Ok(response) => response,
                Err(error) => {
                    debug!(%source, %error, "undecodable datagram");
                    let _ = events.send(ControllerEvent::DecodeError {
                        detail: error.to_string(),
                        source,
                    });
                    continue;
                }
            };

            let _ = events.send(ControllerEvent::Response {
                response: response.clone(),
                source,
            });

            let sequence = response.sequence();
            let waiter = sequence.and_then(|seq| {
                pending
                    .lock()
                    .ok()
                    .and_then(|mut table| table.remove(&seq))
            });

            match waiter {
                Some(tx) => {
                    // The waiter may have timed out between removal and send;
                    // the dropped receiver just discards the response.
                    let _ = tx.send(response);
                }
                None => {
                    debug!(?sequence, %source, "response matched no pending request");
                    let _ = events.send(ControllerEvent::Unmatched { sequence, source });
                }
            }
        }
    })
}
