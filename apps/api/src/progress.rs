//! Progress reporting seam.
#![allow(dead_code)]
//!
//! Generation takes minutes; whoever drives an order (HTTP handler, batch
//! script, future bot) plugs in a sink to surface stage updates. The default
//! sink writes to the log.

use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, percent: u8, message: &str);
}

/// Default sink: progress lines go to the structured log.
pub struct TracingProgress;

#[async_trait]
impl ProgressSink for TracingProgress {
    async fn update(&self, percent: u8, message: &str) {
        info!(percent, "{message}");
    }
}

/// Discards all updates. Used in tests and fire-and-forget callers.
pub struct NullProgress;

#[async_trait]
impl ProgressSink for NullProgress {
    async fn update(&self, _percent: u8, _message: &str) {}
}
