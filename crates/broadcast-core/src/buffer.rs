//! Segment Buffer: a bounded, drop-oldest FIFO of processed segments between the
//! converter and the multicast sender.

use std::time::Duration;

use pipeline_common::DropOldestQueue;

use crate::converter::MpegTsSegment;

/// Bounded FIFO of [`MpegTsSegment`]; never blocks the producer.
pub struct SegmentBuffer {
    queue: DropOldestQueue<MpegTsSegment>,
    dropped: std::sync::atomic::AtomicU64,
}

impl SegmentBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: DropOldestQueue::new(capacity),
            dropped: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Always succeeds; drops the oldest entry (with a warning) if the buffer is full.
    pub fn push(&self, segment: MpegTsSegment) {
        if self.queue.push(segment).is_some() {
            self.dropped
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            tracing::warn!("segment buffer full, dropped oldest segment");
        }
    }

    /// Block up to `timeout_ms` for the next segment.
    pub fn pop(&self, timeout_ms: u64) -> Option<MpegTsSegment> {
        self.queue.pop_timeout(Duration::from_millis(timeout_ms))
    }

    /// Shrink or grow capacity, dropping from the front on shrink.
    pub fn resize(&self, capacity: usize) {
        self.queue.resize(capacity);
    }

    pub fn current_size(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn segment(sequence: u64) -> MpegTsSegment {
        MpegTsSegment {
            data: Bytes::new(),
            sequence,
            duration: 4.0,
            discontinuity: false,
            fetched_at: std::time::SystemTime::now(),
        }
    }

    #[test]
    fn drop_oldest_when_full_preserves_order() {
        let buf = SegmentBuffer::new(3);
        for i in 0..5 {
            buf.push(segment(i));
        }
        assert_eq!(buf.current_size(), 3);
        assert_eq!(buf.dropped_count(), 2);
        assert_eq!(buf.pop(0).unwrap().sequence, 2);
        assert_eq!(buf.pop(0).unwrap().sequence, 3);
        assert_eq!(buf.pop(0).unwrap().sequence, 4);
    }

    #[test]
    fn pop_on_empty_times_out() {
        let buf = SegmentBuffer::new(2);
        assert!(buf.pop(10).is_none());
    }
}
