//! Tracking session: owns the detector, the capture source and the pipeline.
//!
//! A running session has one background task that pumps frames from the
//! capture into the detector, feeds detector results through the pipeline and
//! wakes up when a dwell deadline comes due. Everything that touches the host
//! happens inside that task or behind the shared lock, so frames are handled
//! strictly one at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use handpoint_core::config::{CaptureOptions, DetectorOptions, TrackerConfig};
use handpoint_core::error::TrackerError;
use handpoint_core::host::{ElementId, ElementRole, Host, NewElement};
use handpoint_core::hover::{HoverEvent, HoverState};
use handpoint_core::landmark::{FrameResult, Landmark};
use handpoint_core::pipeline::Pipeline;

use crate::tracker::capture::{CaptureSource, VideoFrame};
use crate::tracker::detector::Detector;

/// Frames buffered between capture and detector before the capture has to wait.
const FRAME_QUEUE_DEPTH: usize = 4;

/// Class carried by the diagnostic overlay.
const OVERLAY_CLASS: &str = "force-debug";

/// Property on the overlay holding the number of hands in the latest frame.
const OVERLAY_HANDS_PROPERTY: &str = "--hand-count";

/// Latest landmarks per detected hand.
pub type HandLandmarks = Vec<Vec<Landmark>>;

type ResultsObserver = Box<dyn FnMut(&FrameResult) + Send>;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLifecycle {
    Uninitialized,
    Initialized,
    Tracking,
    Stopped,
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub id: SessionId,
    pub lifecycle: SessionLifecycle,
    pub started_at: Option<DateTime<Utc>>,
    pub config: TrackerConfig,
}

/// State shared with the run task.
struct Shared<H> {
    host: H,
    pipeline: Pipeline,
    observer: Option<ResultsObserver>,
    overlay: Option<ElementId>,
}

impl<H: Host> Shared<H> {
    fn remove_overlay(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            self.host.remove_element(overlay);
        }
    }
}

struct RunHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Builder for [`TrackingSession`].
pub struct SessionBuilder<H> {
    host: H,
    detector: Box<dyn Detector>,
    capture: Option<Box<dyn CaptureSource>>,
    config: TrackerConfig,
    detector_options: DetectorOptions,
    capture_options: CaptureOptions,
}

impl<H: Host + Send + 'static> SessionBuilder<H> {
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detector_options(mut self, options: DetectorOptions) -> Self {
        self.detector_options = options;
        self
    }

    pub fn capture_options(mut self, options: CaptureOptions) -> Self {
        self.capture_options = options;
        self
    }

    /// Attach the default capture source used when `start` is given none.
    pub fn capture(mut self, capture: impl CaptureSource + 'static) -> Self {
        self.capture = Some(Box::new(capture));
        self
    }

    /// Validate the config and configure the detector.
    ///
    /// Nothing is added to the host until [`TrackingSession::initialize`].
    pub fn build(self) -> Result<TrackingSession<H>, TrackerError> {
        let pipeline = Pipeline::new(&self.config)?;
        self.detector_options.validate()?;

        let mut detector = self.detector;
        detector
            .configure(&self.detector_options)
            .map_err(|e| TrackerError::detector_failed(&format!("{:#}", e)))?;

        let (landmarks, _) = watch::channel(Vec::new());
        let id = SessionId::new();
        debug!(session = %id, "Session created");

        Ok(TrackingSession {
            id,
            config: self.config,
            capture_options: self.capture_options,
            lifecycle: SessionLifecycle::Uninitialized,
            started_at: None,
            shared: Arc::new(Mutex::new(Shared {
                host: self.host,
                pipeline,
                observer: None,
                overlay: None,
            })),
            detector: Arc::new(Mutex::new(detector)),
            capture: self.capture,
            capture_live: false,
            results: None,
            run: None,
            landmarks,
        })
    }
}

/// One pointer-tracking session bound to a host.
pub struct TrackingSession<H> {
    id: SessionId,
    config: TrackerConfig,
    capture_options: CaptureOptions,
    lifecycle: SessionLifecycle,
    started_at: Option<DateTime<Utc>>,
    shared: Arc<Mutex<Shared<H>>>,
    detector: Arc<Mutex<Box<dyn Detector>>>,
    capture: Option<Box<dyn CaptureSource>>,
    /// Set before the capture is asked to start, cleared once it has stopped.
    capture_live: bool,
    /// Receiving end of the sink registered with the detector.
    results: Option<mpsc::UnboundedReceiver<FrameResult>>,
    run: Option<RunHandle>,
    landmarks: watch::Sender<HandLandmarks>,
}

impl<H: Host + Send + 'static> TrackingSession<H> {
    pub fn builder(host: H, detector: impl Detector + 'static) -> SessionBuilder<H> {
        SessionBuilder {
            host,
            detector: Box::new(detector),
            capture: None,
            config: TrackerConfig::default(),
            detector_options: DetectorOptions::default(),
            capture_options: CaptureOptions::default(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> SessionLifecycle {
        self.lifecycle
    }

    pub fn is_tracking(&self) -> bool {
        self.lifecycle == SessionLifecycle::Tracking
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id.clone(),
            lifecycle: self.lifecycle,
            started_at: self.started_at,
            config: self.config.clone(),
        }
    }

    /// Subscribe to the hands seen in the most recent frame.
    pub fn hand_landmarks(&self) -> watch::Receiver<HandLandmarks> {
        self.landmarks.subscribe()
    }

    /// Register a callback that sees every raw detector result before the
    /// pipeline does. Replaces any previous callback.
    pub async fn on_results(&self, observer: impl FnMut(&FrameResult) + Send + 'static) {
        self.shared.lock().await.observer = Some(Box::new(observer));
    }

    /// Execute a closure with access to the host.
    pub async fn with_host<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut H) -> R,
    {
        let mut shared = self.shared.lock().await;
        f(&mut shared.host)
    }

    pub async fn hover_state(&self) -> HoverState {
        self.shared.lock().await.pipeline.hover_state()
    }

    /// Create the pointer and wire detector results. Idempotent.
    pub async fn initialize(&mut self) -> Result<(), TrackerError> {
        if matches!(
            self.lifecycle,
            SessionLifecycle::Initialized | SessionLifecycle::Tracking
        ) {
            return Ok(());
        }

        let results = self.wire_results().await;
        self.results = Some(results);

        {
            let mut shared = self.shared.lock().await;
            let Shared { host, pipeline, .. } = &mut *shared;
            let pointer = pipeline.attach(host);
            debug!(session = %self.id, pointer = %pointer, "Pointer attached");
        }

        self.lifecycle = SessionLifecycle::Initialized;
        info!(session = %self.id, "Session initialized");
        Ok(())
    }

    /// Start the capture and begin tracking.
    ///
    /// Initializes first if needed. A no-op while already tracking. On capture
    /// failure the session returns to the state it was in before the call and
    /// everything this call added to the host is removed.
    pub async fn start(
        &mut self,
        capture: Option<Box<dyn CaptureSource>>,
    ) -> Result<(), TrackerError> {
        if self.is_tracking() {
            debug!(session = %self.id, "Start ignored, already tracking");
            return Ok(());
        }
        if let Some(capture) = capture {
            self.capture = Some(capture);
        }
        if self.capture.is_none() {
            return Err(TrackerError::no_capture_source());
        }

        let previous = self.lifecycle;
        self.initialize().await?;

        let mut results = match self.results.take() {
            Some(results) => results,
            None => self.wire_results().await,
        };
        // Anything delivered before tracking began is stale.
        let mut stale = 0usize;
        while results.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(session = %self.id, stale, "Discarded results received before start");
        }

        if self.config.debug {
            let mut shared = self.shared.lock().await;
            if shared.overlay.is_none() {
                let overlay = shared.host.create_element(
                    NewElement::new(ElementRole::DiagnosticOverlay).with_class(OVERLAY_CLASS),
                );
                shared.overlay = Some(overlay);
            }
        }

        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let Some(capture) = self.capture.as_mut() else {
            return Err(TrackerError::no_capture_source());
        };

        self.capture_live = true;
        if let Err(e) = capture.start(self.capture_options, frames_tx).await {
            self.capture_live = false;
            {
                let mut shared = self.shared.lock().await;
                shared.remove_overlay();
                if previous != SessionLifecycle::Initialized {
                    let Shared { host, pipeline, .. } = &mut *shared;
                    pipeline.reset(host);
                }
            }
            if previous == SessionLifecycle::Initialized {
                self.results = Some(results);
            } else {
                self.lifecycle = previous;
            }
            warn!(session = %self.id, error = %e, "Capture failed to start");
            return Err(TrackerError::capture_failed(&format!("{:#}", e)));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_loop(RunContext {
            session: self.id.clone(),
            shared: Arc::clone(&self.shared),
            detector: Arc::clone(&self.detector),
            frames: frames_rx,
            results,
            landmarks: self.landmarks.clone(),
            shutdown: shutdown_rx,
        }));
        self.run = Some(RunHandle {
            shutdown: shutdown_tx,
            task,
        });

        self.lifecycle = SessionLifecycle::Tracking;
        self.started_at = Some(Utc::now());
        info!(session = %self.id, "Tracking started");
        Ok(())
    }

    /// Stop tracking and remove every visual. Safe to call in any state.
    ///
    /// Once this returns no activation can fire for this run.
    pub async fn stop(&mut self) -> Result<(), TrackerError> {
        if matches!(
            self.lifecycle,
            SessionLifecycle::Uninitialized | SessionLifecycle::Stopped
        ) && !self.capture_live
        {
            return Ok(());
        }

        let mut panicked = false;
        if let Some(run) = self.run.take() {
            let _ = run.shutdown.send(());
            if let Err(e) = run.task.await {
                if e.is_panic() {
                    error!(session = %self.id, "Run task panicked");
                    panicked = true;
                }
            }
        }

        let mut release = Ok(());
        if self.capture_live {
            if let Some(capture) = self.capture.as_mut() {
                release = capture.stop().await;
            }
            self.capture_live = false;
        }

        {
            let mut shared = self.shared.lock().await;
            let Shared { host, pipeline, .. } = &mut *shared;
            pipeline.reset(host);
            shared.remove_overlay();
        }

        self.results = None;
        self.landmarks.send_replace(Vec::new());
        self.lifecycle = SessionLifecycle::Stopped;
        self.started_at = None;
        info!(session = %self.id, "Tracking stopped");

        release.map_err(|e| {
            warn!(session = %self.id, error = %e, "Capture did not stop cleanly");
            TrackerError::capture_release_failed(&format!("{:#}", e))
        })?;
        if panicked {
            return Err(TrackerError::internal(
                "Tracking task panicked; the session was stopped",
            ));
        }
        Ok(())
    }

    /// Stop, optionally swap the config, and start again.
    ///
    /// If the new config is invalid the session stays stopped.
    pub async fn restart(&mut self, config: Option<TrackerConfig>) -> Result<(), TrackerError> {
        self.stop().await?;
        if let Some(config) = config {
            let pipeline = Pipeline::new(&config)?;
            self.shared.lock().await.pipeline = pipeline;
            self.config = config;
            debug!(session = %self.id, "Config replaced");
        }
        self.start(None).await
    }

    /// Stop and release the detector. The session cannot be used afterwards.
    pub async fn shutdown(mut self) -> Result<(), TrackerError> {
        let stopped = self.stop().await;
        self.detector.lock().await.release();
        info!(session = %self.id, "Detector released");
        stopped
    }

    /// Give the detector a fresh result sink and return its receiving end.
    async fn wire_results(&self) -> mpsc::UnboundedReceiver<FrameResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.detector.lock().await.on_result(tx);
        rx
    }
}

impl<H> Drop for TrackingSession<H> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.task.abort();
            debug!(session = %self.id, "Run task aborted on drop");
        }
    }
}

struct RunContext<H> {
    session: SessionId,
    shared: Arc<Mutex<Shared<H>>>,
    detector: Arc<Mutex<Box<dyn Detector>>>,
    frames: mpsc::Receiver<VideoFrame>,
    results: mpsc::UnboundedReceiver<FrameResult>,
    landmarks: watch::Sender<HandLandmarks>,
    shutdown: oneshot::Receiver<()>,
}

async fn run_loop<H: Host + Send + 'static>(ctx: RunContext<H>) {
    let RunContext {
        session,
        shared,
        detector,
        mut frames,
        mut results,
        landmarks,
        mut shutdown,
    } = ctx;

    // Idle placeholder for the timer branch; never polled while disabled.
    const IDLE_WAIT: Duration = Duration::from_secs(3600);

    let mut deadline: Option<Instant> = None;
    let mut frames_open = true;

    loop {
        let wake = deadline.unwrap_or_else(|| Instant::now() + IDLE_WAIT);

        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                let mut guard = shared.lock().await;
                let Shared { host, pipeline, .. } = &mut *guard;
                if let Some(target) = pipeline.fire_due(host, Instant::now().into_std()) {
                    info!(session = %session, target = %target, "Activated");
                }
                deadline = pipeline.next_deadline().map(Instant::from_std);
            }

            Some(result) = results.recv() => {
                let mut guard = shared.lock().await;
                deadline = handle_result(&session, &mut guard, &landmarks, &result);
            }

            frame = frames.recv(), if frames_open => match frame {
                Some(frame) => {
                    let seq = frame.seq;
                    if let Err(e) = detector.lock().await.send_frame(frame).await {
                        warn!(session = %session, seq, error = %e, "Detector rejected frame");
                    }
                }
                None => {
                    debug!(session = %session, "Capture closed its frame stream");
                    frames_open = false;
                }
            },
        }
    }

    debug!(session = %session, "Run loop exited");
}

/// Run one detector result through observer, landmark buffer and pipeline.
/// Returns the dwell deadline to wait for next.
fn handle_result<H: Host>(
    session: &SessionId,
    shared: &mut Shared<H>,
    landmarks: &watch::Sender<HandLandmarks>,
    result: &FrameResult,
) -> Option<Instant> {
    let Shared {
        host,
        pipeline,
        observer,
        overlay,
    } = shared;

    if let Some(observer) = observer.as_mut() {
        observer(result);
    }
    landmarks.send_replace(result.hands.clone());
    if let Some(overlay) = *overlay {
        host.set_property(overlay, OVERLAY_HANDS_PROPERTY, &result.hands.len().to_string());
    }

    match pipeline.process_frame(host, result, Instant::now().into_std()) {
        Ok(outcome) => {
            for event in outcome.events {
                match event {
                    HoverEvent::Enter(target) => {
                        debug!(session = %session, target = %target, "Dwell started")
                    }
                    HoverEvent::Exit(target) => {
                        debug!(session = %session, target = %target, "Dwell cancelled")
                    }
                    HoverEvent::Activate(target) => {
                        info!(session = %session, target = %target, "Activated")
                    }
                }
            }
        }
        Err(e) => warn!(session = %session, error = %e, "Skipping malformed frame"),
    }

    pipeline.next_deadline().map(Instant::from_std)
}
