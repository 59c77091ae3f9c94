//! Replay of recorded detector output.
//!
//! A recording is a JSON-lines file with one `FrameResult` per line. The
//! replay capture ticks at the configured frame rate and the replay detector
//! answers frame `n` with line `n`, so a recording drives a real session the
//! same way a camera and model would.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use handpoint_core::config::{CaptureOptions, DetectorOptions, TrackerConfig};
use handpoint_core::host::ElementId;
use handpoint_core::landmark::FrameResult;
use handpoint_core::scene::{ActivationRecord, Scene};

use crate::tracker::capture::{CaptureSource, FrameSink, VideoFrame};
use crate::tracker::detector::{Detector, ResultSink};
use crate::tracker::session::{SessionId, TrackingSession};

/// Parse a JSON-lines recording. Blank lines are ignored; unparseable lines
/// are logged with their line number and skipped.
pub fn parse_frames(text: &str) -> Vec<FrameResult> {
    let mut frames = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<FrameResult>(line) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping unparseable frame"),
        }
    }
    frames
}

/// Read and parse a recording from disk.
pub fn load_frames(path: &Path) -> Result<Vec<FrameResult>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames from {:?}", path))?;
    let frames = parse_frames(&text);
    debug!(path = ?path, frames = frames.len(), "Loaded recording");
    Ok(frames)
}

/// Capture source that emits `count` empty frames at the configured rate.
pub struct ReplayCapture {
    count: usize,
    task: Option<JoinHandle<()>>,
}

impl ReplayCapture {
    pub fn new(count: usize) -> Self {
        Self { count, task: None }
    }
}

#[async_trait]
impl CaptureSource for ReplayCapture {
    async fn start(&mut self, options: CaptureOptions, frames: FrameSink) -> Result<()> {
        if options.frame_rate == 0 {
            anyhow::bail!("frame rate must be greater than zero");
        }
        let count = self.count as u64;
        let mut ticker = tokio::time::interval(options.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.task = Some(tokio::spawn(async move {
            for seq in 0..count {
                ticker.tick().await;
                let frame = VideoFrame {
                    seq,
                    captured_at: Instant::now().into_std(),
                    width: options.width,
                    height: options.height,
                };
                if frames.send(frame).await.is_err() {
                    debug!(seq, "Session dropped the frame stream");
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}

/// Detector that answers each frame with the recorded result at its index.
pub struct ReplayDetector {
    frames: Arc<Vec<FrameResult>>,
    sink: Option<ResultSink>,
}

impl ReplayDetector {
    pub fn new(frames: Vec<FrameResult>) -> Self {
        Self {
            frames: Arc::new(frames),
            sink: None,
        }
    }
}

#[async_trait]
impl Detector for ReplayDetector {
    fn configure(&mut self, options: &DetectorOptions) -> Result<()> {
        debug!(max_hands = options.max_hands, "Replay detector configured");
        Ok(())
    }

    fn on_result(&mut self, sink: ResultSink) {
        self.sink = Some(sink);
    }

    async fn send_frame(&mut self, frame: VideoFrame) -> Result<()> {
        let result = usize::try_from(frame.seq)
            .ok()
            .and_then(|index| self.frames.get(index))
            .with_context(|| format!("No recorded result for frame {}", frame.seq))?;
        if let Some(sink) = &self.sink {
            // A closed sink means the session stopped listening.
            let _ = sink.send(result.clone());
        }
        Ok(())
    }

    fn release(&mut self) {
        self.sink = None;
    }
}

/// One line of replay output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    Activation {
        element: ElementId,
        name: Option<String>,
        at: DateTime<Utc>,
    },
    Summary(ReplaySummary),
}

impl ReplayEvent {
    pub fn activation(record: &ActivationRecord) -> Self {
        Self::Activation {
            element: record.element,
            name: record.name.clone(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub session: SessionId,
    pub frames: usize,
    /// Frames whose results reached the pipeline.
    pub processed: usize,
    pub activations: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    pub frame_rate: u32,
    /// Extra time to keep tracking after the last frame has been processed,
    /// so a pending dwell can still complete.
    pub linger: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            linger: Duration::from_millis(250),
        }
    }
}

/// Drive a full tracking session over `scene` with a recording.
///
/// Activations are delivered through the scene's listener as they happen.
/// Every recorded frame is processed before the linger period starts, so
/// shutdown never drops queued frames.
pub async fn run_replay(
    scene: Scene,
    config: TrackerConfig,
    frames: Vec<FrameResult>,
    options: ReplayOptions,
) -> Result<ReplaySummary> {
    let started = Instant::now();
    let frame_count = frames.len();
    let capture = ReplayCapture::new(frame_count);

    let mut session = TrackingSession::builder(scene, ReplayDetector::new(frames))
        .config(config)
        .capture_options(CaptureOptions {
            frame_rate: options.frame_rate,
            ..CaptureOptions::default()
        })
        .capture(capture)
        .build()?;

    let (processed_tx, mut processed) = watch::channel(0usize);
    session
        .on_results(move |_| processed_tx.send_modify(|n| *n += 1))
        .await;

    session.start(None).await?;
    info!(session = %session.id(), frames = frame_count, "Replay started");

    processed
        .wait_for(|n| *n >= frame_count)
        .await
        .context("Session stopped before the recording was processed")?;
    tokio::time::sleep(options.linger).await;

    let activations = session.with_host(|scene| scene.activations().len()).await;
    let summary = ReplaySummary {
        session: session.id().clone(),
        frames: frame_count,
        processed: *processed.borrow(),
        activations,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    session.shutdown().await?;

    info!(activations, "Replay finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use handpoint_core::landmark::uniform_hand;
    use handpoint_core::mapping::Viewport;
    use handpoint_core::scene::Rect;

    use super::*;

    fn scene_with_button() -> (Scene, ElementId) {
        let mut scene = Scene::new(Viewport::new(1000.0, 1000.0));
        let button = scene.add_hoverable("Btn", Rect::new(80.0, 80.0, 40.0, 40.0));
        (scene, button)
    }

    fn line(x: f32, y: f32) -> String {
        serde_json::to_string(&FrameResult::single(uniform_hand(x, y))).unwrap()
    }

    #[test]
    fn test_parse_frames_skips_bad_lines() {
        let text = format!("{}\n\nnot json\n{}\n", line(0.9, 0.1), line(0.5, 0.5));
        let frames = parse_frames(&text);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].has_hands());
    }

    #[test]
    fn test_parse_frames_accepts_detector_field_names() {
        let text = r#"{"multiHandLandmarks": [], "multiHandedness": []}"#;
        let frames = parse_frames(text);
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].has_hands());
    }

    #[test]
    fn test_load_frames_reports_missing_file() {
        let err = load_frames(Path::new("/nonexistent/frames.jsonl")).unwrap_err();
        assert!(err.to_string().contains("Failed to read frames"));
    }

    #[test]
    fn test_load_frames_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");
        std::fs::write(&path, format!("{}\n{}\n", line(0.9, 0.1), line(0.9, 0.1))).unwrap();

        assert_eq!(load_frames(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_activation_event_serializes_with_type_tag() {
        let event = ReplayEvent::activation(&ActivationRecord {
            element: ElementId(3),
            name: Some("Btn".into()),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "activation");
        assert_eq!(json["element"], 3);
        assert_eq!(json["name"], "Btn");
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_activates_button_once() {
        let (mut scene, button) = scene_with_button();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scene.on_activation(move |record| sink.lock().unwrap().push(record.element));

        let frames = vec![FrameResult::single(uniform_hand(0.9, 0.1)); 30];
        let config = TrackerConfig {
            hover_delay_ms: 500,
            ..TrackerConfig::default()
        };

        let summary = run_replay(scene, config, frames, ReplayOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.frames, 30);
        assert_eq!(summary.processed, 30);
        assert_eq!(summary.activations, 1);
        assert_eq!(*seen.lock().unwrap(), vec![button]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_without_linger_processes_every_frame() {
        let (scene, _) = scene_with_button();
        let mut frames = vec![FrameResult::empty(); 9];
        frames.push(FrameResult::single(uniform_hand(0.9, 0.1)));
        let options = ReplayOptions {
            linger: Duration::ZERO,
            ..ReplayOptions::default()
        };
        let summary = run_replay(scene, TrackerConfig::default(), frames, options)
            .await
            .unwrap();

        assert_eq!(summary.frames, 10);
        assert_eq!(summary.processed, 10);
        assert_eq!(summary.activations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_without_hands_never_activates() {
        let (scene, _) = scene_with_button();
        let frames = vec![FrameResult::empty(); 20];

        let summary = run_replay(scene, TrackerConfig::default(), frames, ReplayOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.activations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_rejects_invalid_config() {
        let (scene, _) = scene_with_button();
        let config = TrackerConfig {
            sensitivity_x: -1.0,
            ..TrackerConfig::default()
        };

        let err = run_replay(scene, config, Vec::new(), ReplayOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_CONFIG"));
    }
}
