//! Dwell-based hover state machine.
//!
//! The machine tracks at most one target. Frames feed it the element under
//! the pointer via [`HoverMachine::observe`]; the activation deadline is part
//! of the `Dwelling` state, so leaving the target drops the deadline with it
//! and a stale activation cannot fire. The runtime arms a timer for
//! [`HoverMachine::deadline`] and calls [`HoverMachine::fire_due`] when it
//! elapses.
//!
//! # Transitions
//!
//! | State | Observed | Next | Events |
//! |-------|----------|------|--------|
//! | `Idle` | `E` | `Dwelling(E, now)` | `Enter(E)` |
//! | `Idle` | none | `Idle` | |
//! | `Dwelling(E, t)` | `E` | `Dwelling(E, t)` | |
//! | `Dwelling(E, t)` | `E'` | `Dwelling(E', now)` | `Exit(E)`, `Enter(E')` |
//! | `Dwelling(E, t)` | none | `Idle` | `Exit(E)` |
//! | `Dwelling(E, t)` | deadline | `Idle` | `Activate(E)` |
//!
//! After an activation the same element does not re-arm until the pointer
//! has resolved to something else, so one entry yields at most one
//! activation.

use std::time::{Duration, Instant};

use crate::host::ElementId;

/// Current hover state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverState {
    Idle,
    Dwelling {
        target: ElementId,
        since: Instant,
        deadline: Instant,
    },
}

impl HoverState {
    pub fn target(&self) -> Option<ElementId> {
        match self {
            HoverState::Idle => None,
            HoverState::Dwelling { target, .. } => Some(*target),
        }
    }

    pub fn since(&self) -> Option<Instant> {
        match self {
            HoverState::Idle => None,
            HoverState::Dwelling { since, .. } => Some(*since),
        }
    }
}

/// Side effects produced by a transition, in the order they must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverEvent {
    Enter(ElementId),
    Exit(ElementId),
    Activate(ElementId),
}

/// Hover/dwell state machine.
#[derive(Debug)]
pub struct HoverMachine {
    delay: Duration,
    state: HoverState,
    /// Element that just activated and has not been left yet.
    spent: Option<ElementId>,
}

impl HoverMachine {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: HoverState::Idle,
            spent: None,
        }
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// When the pending activation is due, if a dwell is in progress.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            HoverState::Idle => None,
            HoverState::Dwelling { deadline, .. } => Some(deadline),
        }
    }

    /// Advance with the element resolved under the pointer this frame.
    pub fn observe(&mut self, candidate: Option<ElementId>, now: Instant) -> Vec<HoverEvent> {
        let mut events = Vec::with_capacity(2);

        if let HoverState::Dwelling { target, .. } = self.state {
            if candidate == Some(target) {
                return events;
            }
            events.push(HoverEvent::Exit(target));
            self.state = HoverState::Idle;
        }

        if candidate != self.spent {
            self.spent = None;
        }

        if let Some(target) = candidate {
            if self.spent != Some(target) {
                self.state = HoverState::Dwelling {
                    target,
                    since: now,
                    deadline: now + self.delay,
                };
                events.push(HoverEvent::Enter(target));
            }
        }

        events
    }

    /// Fire the pending activation if its deadline has passed.
    ///
    /// Returns the activated element. The machine is `Idle` afterwards.
    pub fn fire_due(&mut self, now: Instant) -> Option<ElementId> {
        match self.state {
            HoverState::Dwelling {
                target, deadline, ..
            } if now >= deadline => {
                self.state = HoverState::Idle;
                self.spent = Some(target);
                Some(target)
            }
            _ => None,
        }
    }

    /// Drop any dwell without activating. Returns the element that was left.
    pub fn reset(&mut self) -> Option<ElementId> {
        let left = self.state.target();
        self.state = HoverState::Idle;
        self.spent = None;
        left
    }
}
