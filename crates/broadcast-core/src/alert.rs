//! Operator-visible alert sink.
//!
//! Passed as a capability at construction rather than reached for as a process-wide
//! singleton, so tests can substitute a capturing sink and multiple components can share
//! one without a global binding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Severity of an alert. Never used for control flow, only for operator visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

/// An identifier returned by [`AlertSink::push`], usable with [`AlertSink::resolve`].
pub type AlertId = u64;

/// A sink components push operator-visible events to.
pub trait AlertSink: Send + Sync {
    fn push(&self, level: AlertLevel, component: &str, message: &str, persistent: bool) -> AlertId;
    fn resolve(&self, id: AlertId);
}

/// A recorded alert, as kept by [`InMemoryAlertSink`].
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub id: AlertId,
    pub level: AlertLevel,
    pub component: String,
    pub message: String,
    pub persistent: bool,
    pub resolved: bool,
}

/// A simple in-process alert sink: keeps every alert in memory, resolves by id.
///
/// Suitable as the default sink until a collaborator supplies a persistent one; also
/// usable directly in tests to assert on emitted alerts.
#[derive(Default)]
pub struct InMemoryAlertSink {
    next_id: AtomicU64,
    records: parking_lot::Mutex<Vec<AlertRecord>>,
}

impl InMemoryAlertSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<AlertRecord> {
        self.records.lock().clone()
    }
}

impl AlertSink for InMemoryAlertSink {
    fn push(&self, level: AlertLevel, component: &str, message: &str, persistent: bool) -> AlertId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(alert_id = id, component, ?level, persistent, "{}", message);
        self.records.lock().push(AlertRecord {
            id,
            level,
            component: component.to_string(),
            message: message.to_string(),
            persistent,
            resolved: false,
        });
        id
    }

    fn resolve(&self, id: AlertId) {
        if let Some(record) = self.records.lock().iter_mut().find(|r| r.id == id) {
            record.resolved = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_resolve_marks_record_resolved() {
        let sink = InMemoryAlertSink::new();
        let id = sink.push(AlertLevel::Warning, "test", "hello", false);
        sink.resolve(id);
        assert!(sink.records().iter().find(|r| r.id == id).unwrap().resolved);
    }
}
