//! Hand detector boundary.
//!
//! The detector is an external model: it accepts camera frames and reports
//! landmark results asynchronously through a registered sink. The session
//! never looks inside it.

use anyhow::Result;
use async_trait::async_trait;
use handpoint_core::config::DetectorOptions;
use handpoint_core::landmark::FrameResult;
use tokio::sync::mpsc;

use crate::tracker::capture::VideoFrame;

/// Where a detector delivers its per-frame results.
pub type ResultSink = mpsc::UnboundedSender<FrameResult>;

/// An external hand-landmark detector.
#[async_trait]
pub trait Detector: Send {
    /// Apply model options. Called once, when the session is built.
    fn configure(&mut self, options: &DetectorOptions) -> Result<()>;

    /// Register the sink for results. Replaces any previous sink.
    fn on_result(&mut self, sink: ResultSink);

    /// Submit a frame for detection. Results arrive through the sink.
    async fn send_frame(&mut self, frame: VideoFrame) -> Result<()>;

    /// Free model resources. The detector is not used afterwards.
    fn release(&mut self);
}
