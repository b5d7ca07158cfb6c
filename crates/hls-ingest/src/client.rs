//! Blocking HLS ingest: manifest selection, periodic playlist refresh, segment fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use pipeline_common::{CancellationToken, DropOldestQueue};
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::HlsError;
use crate::playlist::{self, MediaPlaylist, ParsedPlaylist, Variant};
use crate::segment::{HlsSegment, HlsStreamInfo};

/// Codecs the converter can pass straight through without transcoding.
const SUPPORTED_CODEC_PREFIXES: &[&str] = &["avc1", "hvc1", "hev1", "mp4a", "ac-3", "ec-3"];

/// Segments queued between the fetch thread and the pipeline worker.
const QUEUE_CAPACITY: usize = 3;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const FATAL_AFTER_RETRIES: u32 = 8;

fn codecs_supported(codecs: &str) -> bool {
    codecs
        .split(',')
        .map(|c| c.trim())
        .any(|c| SUPPORTED_CODEC_PREFIXES.iter().any(|p| c.starts_with(p)))
}

fn looks_like_ts(url: &str) -> bool {
    url.splitn(2, '?').next().unwrap_or(url).ends_with(".ts")
}

/// Pick the variant to ingest: highest bandwidth among those that qualify, else the
/// highest-bandwidth variant of any kind.
fn select_variant(variants: &[Variant]) -> Option<&Variant> {
    if variants.is_empty() {
        return None;
    }
    let mut sorted: Vec<&Variant> = variants.iter().collect();
    sorted.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));

    sorted
        .iter()
        .copied()
        .find(|v| looks_like_ts(&v.url) || v.codecs.as_deref().is_some_and(codecs_supported))
        .or_else(|| sorted.first().copied())
}

/// Consumer-facing HLS client: fetches the manifest once at startup, then runs a
/// background thread that refreshes the media playlist and feeds segments into a
/// bounded, drop-oldest queue.
pub struct HlsClient {
    pub info: HlsStreamInfo,
    media_url: String,
    queue: Arc<DropOldestQueue<HlsSegment>>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
    segments_processed: Arc<AtomicU64>,
    discontinuities_detected: Arc<AtomicU64>,
    /// Set once the fetch thread gives up after [`FATAL_AFTER_RETRIES`] consecutive
    /// failures; the pipeline worker polls this to treat the stream as dead.
    fatal: Arc<Mutex<Option<String>>>,
}

impl HlsClient {
    /// Fetch and classify the manifest at `url`, select a variant if it's a master
    /// playlist, and return a client ready to [`HlsClient::start`].
    pub fn connect(url: &str) -> Result<Self, HlsError> {
        let http = build_http_client()?;
        let body = fetch(&http, url)?;
        let outcome = playlist::parse(&body, url);

        for diagnostic in &outcome.diagnostics {
            warn!(url, "{}", diagnostic.message);
        }

        let (media_url, info) = match outcome.playlist {
            ParsedPlaylist::Master(master) => {
                let variant = select_variant(&master.variants).ok_or(HlsError::UnsupportedSource)?;
                let info = HlsStreamInfo {
                    url: variant.url.clone(),
                    bandwidth: variant.bandwidth,
                    codecs: variant
                        .codecs
                        .clone()
                        .unwrap_or_else(|| HlsStreamInfo::default().codecs),
                    width: variant.width.unwrap_or_else(|| HlsStreamInfo::default().width),
                    height: variant
                        .height
                        .unwrap_or_else(|| HlsStreamInfo::default().height),
                };
                (variant.url.clone(), info)
            }
            ParsedPlaylist::Media(_) => (
                url.to_string(),
                HlsStreamInfo {
                    url: url.to_string(),
                    ..HlsStreamInfo::default()
                },
            ),
        };

        // Re-fetch (or reuse, for a directly-media manifest) to check for VOD and prime
        // the media-sequence baseline.
        let media_body = if media_url == url {
            body
        } else {
            fetch(&http, &media_url)?
        };
        let media_outcome = playlist::parse(&media_body, &media_url);
        let media = match media_outcome.playlist {
            ParsedPlaylist::Media(m) => m,
            ParsedPlaylist::Master(_) => return Err(HlsError::UnsupportedSource),
        };
        if media.has_endlist {
            return Err(HlsError::NotLive);
        }

        Ok(HlsClient {
            info,
            media_url,
            queue: Arc::new(DropOldestQueue::new(QUEUE_CAPACITY)),
            token: CancellationToken::new(),
            worker: None,
            segments_processed: Arc::new(AtomicU64::new(0)),
            discontinuities_detected: Arc::new(AtomicU64::new(0)),
            fatal: Arc::new(Mutex::new(None)),
        })
    }

    /// Start the background thread that periodically refreshes the media playlist and
    /// fetches new segments.
    pub fn start(&mut self) {
        let http = build_http_client().expect("client validated reachable in connect()");
        let media_url = self.media_url.clone();
        let queue = self.queue.clone();
        let token = self.token.clone();
        let segments_processed = self.segments_processed.clone();
        let discontinuities_detected = self.discontinuities_detected.clone();
        let fatal = self.fatal.clone();
        let target_duration_hint = Duration::from_secs(1);

        self.worker = Some(std::thread::spawn(move || {
            run_fetch_loop(
                http,
                media_url,
                queue,
                token,
                segments_processed,
                discontinuities_detected,
                fatal,
                target_duration_hint,
            );
        }));
    }

    /// Pop the next available segment, if any. Never blocks.
    pub fn try_next(&self) -> Option<HlsSegment> {
        self.queue.pop_now()
    }

    pub fn segments_processed(&self) -> u64 {
        self.segments_processed.load(Ordering::Relaxed)
    }

    pub fn discontinuities_detected(&self) -> u64 {
        self.discontinuities_detected.load(Ordering::Relaxed)
    }

    /// The fetch thread's [`HlsError::FatalIngest`] message, if it has given up after
    /// repeated failures. Once set, this client's queue will never receive another
    /// segment; the pipeline should treat the stream as dead.
    pub fn fatal_error(&self) -> Option<String> {
        self.fatal.lock().unwrap().clone()
    }

    /// Signal the fetch thread to stop and join it.
    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HlsClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_http_client() -> Result<Client, HlsError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(READ_TIMEOUT)
        .build()
        .map_err(HlsError::TransientNetwork)
}

fn fetch(http: &Client, url: &str) -> Result<Bytes, HlsError> {
    let response = http
        .get(url)
        .send()
        .map_err(HlsError::TransientNetwork)?
        .error_for_status()
        .map_err(HlsError::TransientNetwork)?;
    response.bytes().map_err(HlsError::TransientNetwork)
}

#[allow(clippy::too_many_arguments)]
fn run_fetch_loop(
    http: Client,
    media_url: String,
    queue: Arc<DropOldestQueue<HlsSegment>>,
    token: CancellationToken,
    segments_processed: Arc<AtomicU64>,
    discontinuities_detected: Arc<AtomicU64>,
    fatal: Arc<Mutex<Option<String>>>,
    refresh_interval: Duration,
) {
    let mut consecutive_failures = 0u32;
    let mut backoff = Duration::from_millis(200);
    let mut last_media_sequence: Option<u64> = None;
    let mut seen_uris = std::collections::HashSet::new();
    let mut next_sequence = 0u64;
    let mut durations_seen: Vec<f32> = Vec::new();

    while !token.is_cancelled() {
        let body = match fetch(&http, &media_url) {
            Ok(b) => b,
            Err(e) => {
                consecutive_failures += 1;
                warn!(url = %media_url, error = %e, attempt = consecutive_failures, "playlist refresh failed");
                if consecutive_failures >= FATAL_AFTER_RETRIES {
                    let err = HlsError::FatalIngest(format!(
                        "giving up on {media_url} after {consecutive_failures} consecutive failures: {e}"
                    ));
                    tracing::error!("{err}");
                    *fatal.lock().unwrap() = Some(err.to_string());
                    return;
                }
                if token.sleep(backoff) {
                    return;
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };
        consecutive_failures = 0;
        backoff = Duration::from_millis(200);

        let outcome = playlist::parse(&body, &media_url);
        let media: MediaPlaylist = match outcome.playlist {
            ParsedPlaylist::Media(m) => m,
            ParsedPlaylist::Master(_) => {
                warn!(url = %media_url, "media playlist unexpectedly became a master playlist");
                if token.sleep(refresh_interval) {
                    return;
                }
                continue;
            }
        };

        let sequence_gap = last_media_sequence
            .map(|prev| media.media_sequence > prev + 1)
            .unwrap_or(false);
        last_media_sequence = Some(media.media_sequence);

        for (i, entry) in media.segments.iter().enumerate() {
            if !seen_uris.insert(entry.url.clone()) {
                continue;
            }
            let discontinuity = entry.discontinuity_before || (sequence_gap && i == 0);
            if discontinuity {
                discontinuities_detected.fetch_add(1, Ordering::Relaxed);
            }

            let data = match fetch(&http, &entry.url) {
                Ok(b) => b,
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "segment fetch failed, skipping");
                    continue;
                }
            };

            let duration = if entry.duration > 0.0 {
                entry.duration
            } else if !durations_seen.is_empty() {
                durations_seen.iter().sum::<f32>() / durations_seen.len() as f32
            } else {
                4.0
            };
            durations_seen.push(entry.duration.max(0.0));
            if durations_seen.len() > 16 {
                durations_seen.remove(0);
            }

            let segment = HlsSegment {
                data,
                sequence: next_sequence,
                duration,
                discontinuity,
                fetched_at: SystemTime::now(),
            };
            next_sequence += 1;
            segments_processed.fetch_add(1, Ordering::Relaxed);

            if let Some(_dropped) = queue.push(segment) {
                warn!(url = %media_url, "segment queue full, dropped oldest segment");
            }
        }

        if media.has_endlist {
            info!(url = %media_url, "upstream playlist reached ENDLIST, stopping fetch");
            return;
        }

        if seen_uris.len() > 512 {
            // Bound memory: only recent URIs matter for dedup across refreshes.
            seen_uris.clear();
        }

        if token.sleep(refresh_interval) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_highest_supported_bandwidth() {
        let variants = vec![
            Variant {
                url: "low.m3u8".into(),
                bandwidth: 500_000,
                codecs: Some("avc1.42001e,mp4a.40.2".into()),
                width: None,
                height: None,
            },
            Variant {
                url: "high.m3u8".into(),
                bandwidth: 5_000_000,
                codecs: Some("avc1.640029,mp4a.40.2".into()),
                width: Some(1920),
                height: Some(1080),
            },
        ];
        let chosen = select_variant(&variants).unwrap();
        assert_eq!(chosen.url, "high.m3u8");
    }

    #[test]
    fn falls_back_to_highest_bandwidth_when_no_codec_matches() {
        let variants = vec![Variant {
            url: "weird.m3u8".into(),
            bandwidth: 1_000_000,
            codecs: Some("opus".into()),
            width: None,
            height: None,
        }];
        let chosen = select_variant(&variants).unwrap();
        assert_eq!(chosen.url, "weird.m3u8");
    }

    #[test]
    fn ts_uri_qualifies_even_without_codecs_attribute() {
        let variants = vec![Variant {
            url: "stream.ts".into(),
            bandwidth: 1_000_000,
            codecs: None,
            width: None,
            height: None,
        }];
        assert!(looks_like_ts(&variants[0].url));
        assert_eq!(select_variant(&variants).unwrap().url, "stream.ts");
    }
}
