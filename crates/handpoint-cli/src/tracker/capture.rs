//! Camera capture boundary.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use handpoint_core::config::CaptureOptions;
use tokio::sync::mpsc;

/// One captured camera frame.
///
/// Pixel data stays with the capture/detector pair; the session only routes
/// frames between them.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Monotonic frame number, starting at 0 for each capture run.
    pub seq: u64,
    pub captured_at: Instant,
    pub width: u32,
    pub height: u32,
}

/// Where a capture source pushes frames.
pub type FrameSink = mpsc::Sender<VideoFrame>;

/// An external camera (or any frame producer).
#[async_trait]
pub trait CaptureSource: Send {
    /// Acquire the device and begin pushing frames into `frames`.
    ///
    /// Fails if the device cannot be acquired (e.g. permission denied).
    async fn start(&mut self, options: CaptureOptions, frames: FrameSink) -> Result<()>;

    /// Stop producing frames and release the device.
    async fn stop(&mut self) -> Result<()>;
}
