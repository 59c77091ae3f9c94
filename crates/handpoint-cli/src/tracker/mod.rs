//! Tracking runtime: session, detector/capture boundary, replay and config files.

pub mod capture;
pub mod detector;
pub mod paths;
pub mod replay;
pub mod session;
