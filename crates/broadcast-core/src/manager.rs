//! Stream Manager: the single entry point that owns every configured pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::alert::AlertSink;
use crate::config::StreamConfig;
use crate::error::CoreError;
use crate::pipeline::{PipelineState, StreamPipeline};
use crate::stats::StreamStats;

/// Owns every channel's [`StreamPipeline`] behind one coarse lock.
///
/// A single lock over the whole registry (rather than one lock per entry, or a
/// lock-free map) keeps `start_stream`/`stop_stream`/`stop` trivially free of
/// cross-entry races; the lock is only ever held across a `HashMap` lookup or
/// insert/remove, never across the network or disk I/O a pipeline does while
/// starting, so contention stays short-lived.
pub struct StreamManager {
    pipelines: Mutex<HashMap<String, Arc<StreamPipeline>>>,
    alerts: Arc<dyn AlertSink>,
}

impl StreamManager {
    pub fn new(alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            pipelines: Mutex::new(HashMap::new()),
            alerts,
        }
    }

    /// Start every enabled, valid stream from `configs`. Invalid configs are logged and
    /// skipped rather than aborting the whole startup.
    pub fn start(&self, configs: &[StreamConfig]) {
        for config in configs {
            if !config.enabled {
                continue;
            }
            if let Err(e) = config.validate() {
                tracing::warn!(stream = %config.id, error = %e, "skipping invalid stream config");
                continue;
            }
            self.start_stream_with_config(config.clone());
        }
    }

    /// Idempotent: a no-op if `config.id` is already registered and running.
    pub fn start_stream_with_config(&self, config: StreamConfig) {
        let id = config.id.clone();
        {
            let pipelines = self.pipelines.lock();
            if let Some(existing) = pipelines.get(&id) {
                if existing.is_running() {
                    return;
                }
            }
        }

        // Construction and `start()` touch the network; keep them off the registry lock.
        let pipeline = Arc::new(StreamPipeline::new(config, self.alerts.clone()));
        if let Err(e) = pipeline.start() {
            tracing::warn!(stream = %id, error = %e, "stream failed to start");
        }

        self.pipelines.lock().insert(id, pipeline);
    }

    /// Idempotent: a no-op if `id` isn't registered.
    pub fn stop_stream(&self, id: &str) {
        let pipeline = self.pipelines.lock().remove(id);
        if let Some(pipeline) = pipeline {
            pipeline.stop();
        }
    }

    pub fn start_stream(&self, id: &str, configs: &[StreamConfig]) {
        if let Some(config) = configs.iter().find(|c| c.id == id) {
            self.start_stream_with_config(config.clone());
        }
    }

    /// Stop and deregister every pipeline.
    pub fn stop(&self) {
        let pipelines: Vec<Arc<StreamPipeline>> = self.pipelines.lock().drain().map(|(_, p)| p).collect();
        for pipeline in pipelines {
            pipeline.stop();
        }
    }

    pub fn is_stream_running(&self, id: &str) -> bool {
        self.pipelines
            .lock()
            .get(id)
            .map(|p| p.is_running())
            .unwrap_or(false)
    }

    pub fn stream_state(&self, id: &str) -> Option<PipelineState> {
        self.pipelines.lock().get(id).map(|p| p.state())
    }

    pub fn get_stream_stats(&self, id: &str) -> Option<StreamStats> {
        self.pipelines.lock().get(id).map(|p| p.stats())
    }

    /// Resize a configured stream's segment buffer. Errors with [`CoreError::UnknownStream`]
    /// if `id` isn't registered, rather than silently doing nothing.
    pub fn set_stream_buffer_size(&self, id: &str, n: usize) -> Result<(), CoreError> {
        match self.pipelines.lock().get(id) {
            Some(pipeline) => {
                pipeline.set_buffer_size(n);
                Ok(())
            }
            None => Err(CoreError::UnknownStream(id.to_string())),
        }
    }

    pub fn running_stream_ids(&self) -> Vec<String> {
        self.pipelines
            .lock()
            .iter()
            .filter(|(_, p)| p.is_running())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::InMemoryAlertSink;
    use std::net::Ipv4Addr;

    fn config(id: &str) -> StreamConfig {
        StreamConfig {
            id: id.to_string(),
            name: id.to_string(),
            hls_input_url: "http://example.invalid/live.m3u8".into(),
            multicast_group_ip: Ipv4Addr::new(239, 1, 1, 1),
            multicast_port: 5000,
            interface: None,
            buffer_size: 3,
            enabled: true,
        }
    }

    #[test]
    fn stop_stream_on_unknown_id_is_a_no_op() {
        let manager = StreamManager::new(InMemoryAlertSink::new());
        manager.stop_stream("does-not-exist");
        assert!(!manager.is_stream_running("does-not-exist"));
    }

    #[test]
    fn disabled_stream_is_skipped_on_start() {
        let manager = StreamManager::new(InMemoryAlertSink::new());
        let mut cfg = config("chan1");
        cfg.enabled = false;
        manager.start(&[cfg]);
        assert!(manager.running_stream_ids().is_empty());
    }

    #[test]
    fn resizing_an_unknown_stream_errors() {
        let manager = StreamManager::new(InMemoryAlertSink::new());
        assert!(matches!(
            manager.set_stream_buffer_size("does-not-exist", 5),
            Err(CoreError::UnknownStream(_))
        ));
    }
}
