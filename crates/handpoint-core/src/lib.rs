//! Core types and logic for handpoint.
//!
//! This crate turns hand-landmark detections into a virtual pointer that can
//! hover over and activate on-screen elements. It has no async runtime and no
//! display dependency: everything that touches the screen goes through the
//! [`host::Host`] capability trait.
//!
//! # Modules
//!
//! - [`error`]: Session-boundary error types with actionable suggestions
//! - [`landmark`]: Landmarks, frame results, and ingress validation
//! - [`config`]: Tracker, detector, and capture configuration
//! - [`mapping`]: Landmark to screen-pixel mapping
//! - [`host`]: Host environment capability trait and marker names
//! - [`hit_test`]: Interactive element resolution under a point
//! - [`cursor`]: Pointer visual presenter
//! - [`hover`]: Dwell-based hover state machine
//! - [`pipeline`]: Per-frame orchestration of the above
//! - [`scene`]: In-memory host implementation
//!
//! # Data Flow
//!
//! | Step | Component | Output |
//! |------|-----------|--------|
//! | 1 | [`landmark::FrameResult::primary_landmark`] | validated landmark |
//! | 2 | [`mapping::map_landmark`] | screen point |
//! | 3 | [`cursor::CursorPresenter::update`] | pointer moved |
//! | 4 | [`hit_test::resolve`] | interactive element or none |
//! | 5 | [`hover::HoverMachine::observe`] | enter / exit transitions |
//!
//! Activation is time-based: the runtime sleeps until
//! [`pipeline::Pipeline::next_deadline`] and then calls
//! [`pipeline::Pipeline::fire_due`].

pub mod config;
pub mod cursor;
pub mod error;
pub mod host;
pub mod hover;
pub mod landmark;
pub mod mapping;
pub mod pipeline;
pub mod scene;
