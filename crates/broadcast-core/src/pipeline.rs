//! Stream Pipeline: the per-channel worker wiring HLS Client → Converter → Buffer → Sender.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use hls_ingest::HlsClient;
use pipeline_common::CancellationToken;

use crate::alert::{AlertLevel, AlertSink};
use crate::buffer::SegmentBuffer;
use crate::config::StreamConfig;
use crate::converter::MpegTsConverter;
use crate::error::CoreError;
use crate::multicast::{MulticastConfig, MulticastSender};
use crate::stats::StreamStats;

/// The pipeline state machine. `Failed` is terminal, reachable from `Starting` or `Running`.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed(String),
}

/// A worker's drop-oldest window before the sleep-and-retry loop advances.
const IDLE_SLEEP: Duration = Duration::from_millis(100);
/// Sleep after a sender restart attempt fails, before the worker loops again.
const RESTART_BACKOFF: Duration = Duration::from_secs(2);

struct Shared {
    state: Mutex<PipelineState>,
    buffer: SegmentBuffer,
    segments_processed: AtomicU64,
    discontinuities_detected: AtomicU64,
    sender_stats: Mutex<Option<Arc<crate::multicast::SenderStats>>>,
}

/// Push an info alert for `state` and install it as the pipeline's current state.
/// Free function so both [`StreamPipeline::transition`] and the worker thread (which
/// only has `Arc<Shared>`, not `&StreamPipeline`) can reach it.
fn transition_shared(shared: &Shared, alerts: &Arc<dyn AlertSink>, stream_id: &str, state: PipelineState) {
    alerts.push(AlertLevel::Info, stream_id, &format!("{:?}", state), false);
    *shared.state.lock() = state;
}

/// A single channel's pipeline: owns its HLS client, converter, buffer, and sender.
pub struct StreamPipeline {
    config: StreamConfig,
    alerts: Arc<dyn AlertSink>,
    token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
    client_info: Mutex<Option<hls_ingest::HlsStreamInfo>>,
}

impl StreamPipeline {
    pub fn new(config: StreamConfig, alerts: Arc<dyn AlertSink>) -> Self {
        let capacity = config.buffer_size;
        Self {
            config,
            alerts,
            token: CancellationToken::new(),
            worker: Mutex::new(None),
            shared: Arc::new(Shared {
                state: Mutex::new(PipelineState::Created),
                buffer: SegmentBuffer::new(capacity),
                segments_processed: AtomicU64::new(0),
                discontinuities_detected: AtomicU64::new(0),
                sender_stats: Mutex::new(None),
            }),
            client_info: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.shared.state.lock(), PipelineState::Running)
    }

    fn transition(&self, state: PipelineState) {
        transition_shared(&self.shared, &self.alerts, &self.config.id, state);
    }

    /// Validate, construct owned components, and spawn the worker thread.
    pub fn start(&self) -> Result<(), CoreError> {
        self.transition(PipelineState::Starting);

        if let Err(e) = self.config.validate() {
            self.transition(PipelineState::Failed(e.clone()));
            return Err(CoreError::ConfigInvalid(e));
        }

        let mc_config = MulticastConfig {
            group: self.config.multicast_group_ip,
            port: self.config.multicast_port,
            interface: self.config.interface,
            ttl: 4,
            bitrate_kbps: 0,
        };
        let sender = match MulticastSender::initialize(mc_config) {
            Ok(s) => s,
            Err(e) => {
                self.transition(PipelineState::Failed(e.to_string()));
                return Err(e);
            }
        };
        *self.shared.sender_stats.lock() = Some(sender.stats());

        let mut client = match HlsClient::connect(&self.config.hls_input_url) {
            Ok(c) => c,
            Err(e) => {
                self.transition(PipelineState::Failed(e.to_string()));
                return Err(CoreError::UnsupportedSource(e.to_string()));
            }
        };
        *self.client_info.lock() = Some(client.info.clone());
        client.start();

        let converter = MpegTsConverter::new(1, 1);

        self.transition(PipelineState::Running);

        let shared = self.shared.clone();
        let token = self.token.clone();
        let alerts = self.alerts.clone();
        let stream_id = self.config.id.clone();

        let handle = std::thread::spawn(move || {
            run_worker(client, converter, sender, shared, token, alerts, stream_id)
        });
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Signal the worker to stop, join it, and discard the buffer.
    pub fn stop(&self) {
        if matches!(*self.shared.state.lock(), PipelineState::Stopped) {
            return;
        }
        self.transition(PipelineState::Stopping);
        self.token.cancel();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.transition(PipelineState::Stopped);
    }

    pub fn stats(&self) -> StreamStats {
        let sender_stats = self.shared.sender_stats.lock();
        let client_info = self.client_info.lock();
        let (bitrate_bps, packets_transmitted) = sender_stats
            .as_ref()
            .map(|s| (s.bitrate_ewma_bps(), s.packets_sent.load(Ordering::Relaxed)))
            .unwrap_or((0.0, 0));
        let (resolution, bandwidth, codecs) = client_info
            .as_ref()
            .map(|i| ((i.width, i.height), i.bandwidth, i.codecs.clone()))
            .unwrap_or(((0, 0), 0, String::new()));

        StreamStats {
            segments_processed: self.shared.segments_processed.load(Ordering::Relaxed),
            discontinuities_detected: self.shared.discontinuities_detected.load(Ordering::Relaxed),
            buffer_fill: self.shared.buffer.current_size(),
            buffer_capacity: self.shared.buffer.capacity(),
            packets_transmitted,
            bitrate_bps,
            resolution,
            bandwidth,
            codecs,
        }
    }

    pub fn set_buffer_size(&self, n: usize) {
        self.shared.buffer.resize(n);
    }
}

fn run_worker(
    mut client: HlsClient,
    mut converter: MpegTsConverter,
    mut sender: MulticastSender,
    shared: Arc<Shared>,
    token: CancellationToken,
    alerts: Arc<dyn AlertSink>,
    stream_id: String,
) {
    let mut last_discontinuities = 0u64;

    while !token.is_cancelled() {
        if !sender.is_running() {
            match sender.restart() {
                Ok(()) => {
                    *shared.sender_stats.lock() = Some(sender.stats());
                    alerts.push(
                        AlertLevel::Warning,
                        &stream_id,
                        "multicast sender restarted after unexpected stop",
                        false,
                    );
                }
                Err(e) => {
                    alerts.push(
                        AlertLevel::Error,
                        &stream_id,
                        &format!("multicast sender restart failed: {e}"),
                        true,
                    );
                    if token.sleep(RESTART_BACKOFF) {
                        break;
                    }
                    continue;
                }
            }
        }

        let Some(segment) = client.try_next() else {
            if let Some(fatal) = client.fatal_error() {
                alerts.push(AlertLevel::Error, &stream_id, &fatal, true);
                transition_shared(&shared, &alerts, &stream_id, PipelineState::Failed(fatal));
                break;
            }
            if token.sleep(IDLE_SLEEP) {
                break;
            }
            continue;
        };

        let discontinuities_now = client.discontinuities_detected();
        if discontinuities_now != last_discontinuities {
            shared.discontinuities_detected.fetch_add(
                discontinuities_now.saturating_sub(last_discontinuities),
                Ordering::Relaxed,
            );
            last_discontinuities = discontinuities_now;
        }

        let discontinuity = segment.discontinuity;
        let Some(converted) = converter.convert(&segment) else {
            continue;
        };
        shared.segments_processed.fetch_add(1, Ordering::Relaxed);

        shared.buffer.push(converted);

        if let Some(ready) = shared.buffer.pop(0) {
            sender.send(ready.data.to_vec(), discontinuity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::InMemoryAlertSink;
    use std::net::Ipv4Addr;

    #[test]
    fn starting_with_invalid_address_fails_without_touching_network() {
        let config = StreamConfig {
            id: "chan1".into(),
            name: "Channel 1".into(),
            hls_input_url: "http://example.invalid/live.m3u8".into(),
            multicast_group_ip: Ipv4Addr::new(10, 0, 0, 1),
            multicast_port: 1234,
            interface: None,
            buffer_size: 3,
            enabled: true,
        };
        let pipeline = StreamPipeline::new(config, InMemoryAlertSink::new());
        assert!(pipeline.start().is_err());
        assert!(matches!(pipeline.state(), PipelineState::Failed(_)));
    }
}
