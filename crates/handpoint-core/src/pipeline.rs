//! Per-frame orchestration of mapping, presentation, hit-testing and hover.
//!
//! [`Pipeline`] owns the cursor presenter and the hover machine and applies
//! hover events to the host. It does no I/O and never sleeps; the runtime
//! supplies timestamps and is responsible for waking up at
//! [`Pipeline::next_deadline`].

use std::time::Instant;

use crate::config::TrackerConfig;
use crate::cursor::CursorPresenter;
use crate::error::TrackerError;
use crate::hit_test;
use crate::host::{ElementId, Host, HOVERED_CLASS};
use crate::hover::{HoverEvent, HoverMachine, HoverState};
use crate::landmark::{FrameError, FrameResult, LandmarkIndex};
use crate::mapping::{map_landmark, ScreenPoint, Sensitivity};

/// What one processed frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Mapped pointer position, `None` when the frame had no hands.
    pub position: Option<ScreenPoint>,
    /// Hover events applied to the host, including an activation that came due.
    pub events: Vec<HoverEvent>,
}

/// The landmark-to-interaction pipeline for one session.
#[derive(Debug)]
pub struct Pipeline {
    landmark: LandmarkIndex,
    sensitivity: Sensitivity,
    cursor: CursorPresenter,
    hover: HoverMachine,
}

impl Pipeline {
    /// Build a pipeline from a config. Fails if the config is invalid.
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let landmark = config.validate()?;
        Ok(Self {
            landmark,
            sensitivity: Sensitivity {
                x: config.sensitivity_x,
                y: config.sensitivity_y,
            },
            cursor: CursorPresenter::new(config.cursor_image_url.clone(), config.hover_delay()),
            hover: HoverMachine::new(config.hover_delay()),
        })
    }

    /// Create the pointer visual. Idempotent.
    pub fn attach<H: Host + ?Sized>(&mut self, host: &mut H) -> ElementId {
        self.cursor.create(host)
    }

    pub fn is_attached(&self) -> bool {
        self.cursor.pointer().is_some()
    }

    /// Process one detector result.
    ///
    /// A frame without hands changes nothing. A malformed frame returns an
    /// error and also changes nothing; the caller logs it and moves on.
    pub fn process_frame<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        frame: &FrameResult,
        now: Instant,
    ) -> Result<FrameOutcome, FrameError> {
        let Some(landmark) = frame.primary_landmark(self.landmark)? else {
            return Ok(FrameOutcome::default());
        };

        let mut outcome = FrameOutcome::default();

        // A deadline that passed before this frame was handled still wins.
        if let Some(target) = self.fire_due(host, now) {
            outcome.events.push(HoverEvent::Activate(target));
        }

        let position = map_landmark(landmark, self.sensitivity, host.viewport());
        self.cursor.update(host, position);
        outcome.position = Some(position);

        let candidate = hit_test::resolve(host, position);
        let events = self.hover.observe(candidate, now);
        self.apply(host, &events);
        outcome.events.extend(events);

        Ok(outcome)
    }

    /// Fire the pending activation if it is due.
    pub fn fire_due<H: Host + ?Sized>(&mut self, host: &mut H, now: Instant) -> Option<ElementId> {
        let target = self.hover.fire_due(now)?;
        host.dispatch_activation(target);
        host.remove_class(target, HOVERED_CLASS);
        self.cursor.set_dwelling(host, false);
        Some(target)
    }

    /// When the runtime must call [`Pipeline::fire_due`] next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hover.deadline()
    }

    pub fn hover_state(&self) -> HoverState {
        self.hover.state()
    }

    /// Leave any dwell without activating and remove the pointer.
    pub fn reset<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(target) = self.hover.reset() {
            self.apply(host, &[HoverEvent::Exit(target)]);
        }
        self.cursor.destroy(host);
    }

    fn apply<H: Host + ?Sized>(&mut self, host: &mut H, events: &[HoverEvent]) {
        for event in events {
            match *event {
                HoverEvent::Enter(target) => {
                    host.add_class(target, HOVERED_CLASS);
                    self.cursor.set_dwelling(host, true);
                }
                HoverEvent::Exit(target) => {
                    host.remove_class(target, HOVERED_CLASS);
                    self.cursor.set_dwelling(host, false);
                }
                HoverEvent::Activate(_) => {}
            }
        }
    }
}
