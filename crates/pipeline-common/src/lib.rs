//! # Pipeline Common
//!
//! Shared primitives for the stream pipelines: cooperative cancellation and the
//! drop-oldest queue used by both the HLS client and the segment buffer.
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

pub mod cancellation;
pub mod queue;

pub use cancellation::CancellationToken;
pub use queue::DropOldestQueue;
