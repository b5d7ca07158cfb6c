//! Multicast Sender: binds a UDP socket with multicast options and paces 1316-byte
//! datagram emission with discontinuity-aware queue pruning.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::error::CoreError;
use pipeline_common::CancellationToken;

/// TS packets per outbound datagram (1316 bytes).
pub const PACKETS_PER_CHUNK: usize = 7;
pub const CHUNK_SIZE: usize = PACKETS_PER_CHUNK * 188;

const SEND_BUFFER_BYTES: usize = 1024 * 1024;
const DEFAULT_TTL: u32 = 4;
const PRUNE_THRESHOLD: usize = 10;
const PRUNE_KEEP: usize = 5;
const EWMA_ALPHA: f64 = 0.1;

/// Whether `addr` is a valid IPv4 multicast destination (224.0.0.0/4).
pub fn is_multicast_v4(addr: Ipv4Addr) -> bool {
    addr.is_multicast()
}

/// Runtime counters for a sender, snapshot-read by the Stream Manager's stats API.
#[derive(Debug, Default)]
pub struct SenderStats {
    pub packets_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub errors: AtomicU64,
    bitrate_ewma_bps: Mutex<f64>,
}

impl SenderStats {
    pub fn bitrate_ewma_bps(&self) -> f64 {
        *self.bitrate_ewma_bps.lock().unwrap()
    }
}

struct OutboundQueue {
    items: Mutex<std::collections::VecDeque<(Vec<u8>, bool)>>,
    not_empty: Condvar,
}

impl OutboundQueue {
    fn new() -> Self {
        Self {
            items: Mutex::new(std::collections::VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    fn push(&self, bytes: Vec<u8>, discontinuity: bool) {
        let mut items = self.items.lock().unwrap();
        if discontinuity && items.len() > PRUNE_THRESHOLD {
            while items.len() > PRUNE_KEEP {
                items.pop_front();
            }
        }
        items.push_back((bytes, discontinuity));
        self.not_empty.notify_one();
    }

    fn pop_timeout(&self, timeout: Duration) -> Option<(Vec<u8>, bool)> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.pop_front() {
            return Some(item);
        }
        let (mut items, _) = self.not_empty.wait_timeout(items, timeout).unwrap();
        items.pop_front()
    }
}

/// Configuration for a single multicast destination.
#[derive(Clone)]
pub struct MulticastConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    pub interface: Option<Ipv4Addr>,
    pub ttl: u32,
    pub bitrate_kbps: u32,
}

impl MulticastConfig {
    pub fn new(group: Ipv4Addr, port: u16) -> Self {
        Self {
            group,
            port,
            interface: None,
            ttl: DEFAULT_TTL,
            bitrate_kbps: 0,
        }
    }
}

/// Multicast sender: owns the UDP socket and the worker thread that drains the queue.
pub struct MulticastSender {
    config: MulticastConfig,
    queue: Arc<OutboundQueue>,
    stats: Arc<SenderStats>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl MulticastSender {
    /// Create, bind, and configure the UDP socket; send a sentinel probe datagram.
    pub fn initialize(config: MulticastConfig) -> Result<Self, CoreError> {
        if !is_multicast_v4(config.group) {
            return Err(CoreError::SenderInitFailure(format!(
                "{} is not in 224.0.0.0/4",
                config.group
            )));
        }

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| CoreError::SenderInitFailure(format!("socket creation: {e}")))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| CoreError::SenderInitFailure(format!("SO_REUSEADDR: {e}")))?;
        #[cfg(unix)]
        {
            let _ = socket.set_reuse_port(true);
        }
        socket
            .set_multicast_ttl_v4(config.ttl)
            .map_err(|e| CoreError::SenderInitFailure(format!("IP_MULTICAST_TTL: {e}")))?;
        socket
            .set_multicast_loop_v4(true)
            .map_err(|e| CoreError::SenderInitFailure(format!("IP_MULTICAST_LOOP: {e}")))?;
        if let Some(interface) = config.interface {
            socket
                .set_multicast_if_v4(&interface)
                .map_err(|e| CoreError::SenderInitFailure(format!("IP_MULTICAST_IF: {e}")))?;
        }
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);
        socket
            .bind(&SockAddr::from(bind_addr))
            .map_err(|e| CoreError::SenderInitFailure(format!("bind: {e}")))?;
        socket
            .set_send_buffer_size(SEND_BUFFER_BYTES)
            .map_err(|e| CoreError::SenderInitFailure(format!("SO_SNDBUF: {e}")))?;

        let destination = SockAddr::from(SocketAddrV4::new(config.group, config.port));
        let probe = ts::raw::null_packet();
        socket
            .send_to(&probe, &destination)
            .map_err(|e| CoreError::SenderInitFailure(format!("sentinel probe: {e}")))?;

        let queue = Arc::new(OutboundQueue::new());
        let stats = Arc::new(SenderStats::default());
        let token = CancellationToken::new();

        let worker = {
            let queue = queue.clone();
            let stats = stats.clone();
            let token = token.clone();
            let bitrate_kbps = config.bitrate_kbps;
            std::thread::spawn(move || run_sender_loop(socket, destination, queue, stats, token, bitrate_kbps))
        };

        Ok(Self {
            config,
            queue,
            stats,
            token,
            worker: Some(worker),
        })
    }

    /// Whether the worker thread is still alive. `false` means the sender has stopped
    /// unexpectedly (as opposed to via an explicit [`MulticastSender::stop`]).
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Tear down the current socket/worker and reinitialize against the same
    /// destination, replacing this sender's queue, stats, and cancellation token.
    ///
    /// Pending, unsent datagrams in the old queue are discarded: a fresh socket means a
    /// fresh pacing window, and replaying stale queue contents through it would just
    /// reintroduce the backlog the restart was meant to clear.
    pub fn restart(&mut self) -> Result<(), CoreError> {
        self.stop();
        let fresh = Self::initialize(self.config.clone())?;
        *self = fresh;
        Ok(())
    }

    /// Enqueue `bytes` for transmission. On discontinuity, the queue is pruned first so
    /// the sender doesn't catch up through stale pre-break data.
    pub fn send(&self, bytes: Vec<u8>, discontinuity: bool) {
        self.queue.push(bytes, discontinuity);
    }

    pub fn stats(&self) -> Arc<SenderStats> {
        self.stats.clone()
    }

    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MulticastSender {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_sender_loop(
    socket: Socket,
    destination: SockAddr,
    queue: Arc<OutboundQueue>,
    stats: Arc<SenderStats>,
    token: CancellationToken,
    bitrate_kbps: u32,
) {
    let mut window_start = Instant::now();
    let mut window_bytes: u64 = 0;

    while !token.is_cancelled() {
        let Some((bytes, _discontinuity)) = queue.pop_timeout(Duration::from_millis(100)) else {
            continue;
        };

        for chunk in bytes.chunks(CHUNK_SIZE) {
            match socket.send_to(chunk, &destination) {
                Ok(sent) => {
                    stats.packets_sent.fetch_add((sent / 188) as u64, Ordering::Relaxed);
                    stats.bytes_sent.fetch_add(sent as u64, Ordering::Relaxed);
                    window_bytes += sent as u64;
                }
                Err(e) => {
                    stats.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "multicast send failed, continuing");
                    continue;
                }
            }

            if bitrate_kbps > 0 {
                let elapsed = window_start.elapsed();
                let expected_bytes = (bitrate_kbps as u64 * 1000 / 8) * elapsed.as_millis() as u64 / 1000;
                if window_bytes > expected_bytes {
                    let deficit_bytes = window_bytes - expected_bytes;
                    let deficit_ms = deficit_bytes * 8 * 1000 / (bitrate_kbps as u64 * 1000).max(1);
                    std::thread::sleep(Duration::from_millis(deficit_ms));
                }
            }
        }

        if window_start.elapsed() >= Duration::from_secs(1) {
            let instantaneous = window_bytes as f64 * 8.0 / window_start.elapsed().as_secs_f64();
            let mut ewma = stats.bitrate_ewma_bps.lock().unwrap();
            *ewma = if *ewma == 0.0 {
                instantaneous
            } else {
                EWMA_ALPHA * instantaneous + (1.0 - EWMA_ALPHA) * *ewma
            };
            window_start = Instant::now();
            window_bytes = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicast_range_is_validated() {
        assert!(is_multicast_v4(Ipv4Addr::new(239, 1, 1, 1)));
        assert!(!is_multicast_v4(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn stopped_sender_reports_not_running() {
        let mut sender = MulticastSender::initialize(MulticastConfig::new(Ipv4Addr::new(239, 1, 1, 1), 19001))
            .expect("bind should succeed in test environment");
        assert!(sender.is_running());
        sender.stop();
        assert!(!sender.is_running());
    }
}
