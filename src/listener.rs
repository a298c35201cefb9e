//! UDP ingestion listener
//!
//! Receives datagrams from the wearable, runs them through the decoder chain and
//! records the outcome. The receive call is the only blocking operation in the
//! bridge and is bounded by the poll interval, so the loop regularly gets a
//! chance to re-check connection staleness and the shutdown flag.

use crate::context::BridgeContext;
use crate::decoder::{Decoded, DecoderChain};
use crate::error::{BridgeError, Result};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Log a progress line every this many datagrams
const PROGRESS_LOG_EVERY: u64 = 1000;

/// Log a payload preview every this many datagrams
const PREVIEW_LOG_EVERY: u64 = 5000;

/// Characters shown in a payload preview
const PREVIEW_CHARS: usize = 200;

/// Log a persistent receive error once per this many consecutive failures
const FAILURE_LOG_EVERY: u64 = 100;

/// Pause after a receive error that returned without waiting
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Outcome of a single receive step
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A datagram arrived; `decoded` is the chain's result
    Received {
        from: SocketAddr,
        decoded: Option<Decoded>,
    },
    /// The receive timed out; `lost_after` is set if the link just went stale
    TimedOut { lost_after: Option<Duration> },
    /// A transient receive error; the loop keeps going
    Failed(String),
}

/// Blocking UDP listener feeding the shared context
pub struct IngestionListener {
    socket: UdpSocket,
    context: Arc<BridgeContext>,
    chain: DecoderChain,
    buffer: Vec<u8>,
}

impl IngestionListener {
    /// Bind to the configured address. Failure here is fatal for the bridge.
    pub fn bind(context: Arc<BridgeContext>) -> Result<Self> {
        let addr = context.config().socket_addr();
        let socket = UdpSocket::bind(addr).map_err(|source| BridgeError::Bind { addr, source })?;
        Self::from_socket(socket, context)
    }

    /// Wrap an already bound socket
    pub fn from_socket(socket: UdpSocket, context: Arc<BridgeContext>) -> Result<Self> {
        socket.set_read_timeout(Some(context.config().poll_interval()))?;
        let buffer = vec![0; context.config().max_datagram_bytes];
        Ok(Self {
            socket,
            context,
            chain: DecoderChain::standard(),
            buffer,
        })
    }

    /// Replace the decoder chain
    pub fn with_chain(mut self, chain: DecoderChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until the context's shutdown flag is cleared
    pub fn run(&mut self) {
        match self.socket.local_addr() {
            Ok(addr) => info!(%addr, "UDP listener active"),
            Err(_) => info!("UDP listener active"),
        }

        let mut consecutive_failures: u64 = 0;
        while self.context.is_running() {
            match self.poll_once() {
                PollOutcome::Received { .. } => consecutive_failures = 0,
                PollOutcome::TimedOut { lost_after } => {
                    consecutive_failures = 0;
                    if let Some(silence) = lost_after {
                        warn!(silence_secs = silence.as_secs(), "Wearable connection lost");
                    }
                }
                PollOutcome::Failed(error) => {
                    consecutive_failures += 1;
                    if should_log_failure(consecutive_failures) {
                        warn!(%error, consecutive_failures, "UDP receive error");
                    }
                    thread::sleep(RECEIVE_ERROR_BACKOFF);
                }
            }
        }

        info!("UDP listener stopped");
    }

    /// Wait for one datagram, or for the receive timeout to expire
    pub fn poll_once(&mut self) -> PollOutcome {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((len, from)) => {
                let now = Instant::now();
                let decoded = self.handle_datagram(&self.buffer[..len], now);
                PollOutcome::Received { from, decoded }
            }
            Err(e) if is_timeout(&e) => {
                let lost_after = self
                    .context
                    .connection()
                    .lock()
                    .check_staleness(Instant::now());
                PollOutcome::TimedOut { lost_after }
            }
            Err(e) => PollOutcome::Failed(e.to_string()),
        }
    }

    /// Decode one datagram and record it in the shared context
    pub fn handle_datagram(&self, bytes: &[u8], now: Instant) -> Option<Decoded> {
        let text = String::from_utf8_lossy(bytes);
        let timestamp = self.context.elapsed_secs(now);
        let decoded = self.chain.decode(&text);

        if let Some(decoded) = &decoded {
            decoded.apply(timestamp, &mut self.context.store().lock());
        }

        let stats = {
            let mut ingest = self.context.ingest().lock();
            ingest.stats.packets_received += 1;
            if let Some(decoded) = &decoded {
                ingest.stats.successful_parses += 1;
                ingest.last_update = Some(decoded.summary.clone());
                ingest.last_strategy = Some(decoded.strategy);
            }
            ingest.stats
        };

        self.context.connection().lock().record_receipt(now);

        if stats.packets_received % PROGRESS_LOG_EVERY == 1 {
            info!(
                packets_received = stats.packets_received,
                successful_parses = stats.successful_parses,
                "Processed datagrams"
            );
        }
        if stats.packets_received % PREVIEW_LOG_EVERY == 1 {
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            debug!(%preview, "Sample datagram");
        }

        decoded
    }
}

fn should_log_failure(consecutive: u64) -> bool {
    consecutive % FAILURE_LOG_EVERY == 1
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
