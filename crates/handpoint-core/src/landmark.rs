//! Hand landmarks and per-frame detector results.
//!
//! A detector reports zero or more hands per frame, each as 21 landmarks in
//! normalized camera space (x grows rightward in the camera image, y grows
//! downward, both nominally in `[0, 1]`). Only the first hand drives the
//! pointer.
//!
//! Results are validated on ingress: [`FrameResult::primary_landmark`] checks
//! the shape of the first hand instead of trusting the payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of landmarks on one detected hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: u8 = 0;
pub const THUMB_CMC: u8 = 1;
pub const THUMB_MCP: u8 = 2;
pub const THUMB_IP: u8 = 3;
pub const THUMB_TIP: u8 = 4;
pub const INDEX_MCP: u8 = 5;
pub const INDEX_PIP: u8 = 6;
pub const INDEX_DIP: u8 = 7;
pub const INDEX_TIP: u8 = 8;
pub const MIDDLE_MCP: u8 = 9;
pub const MIDDLE_PIP: u8 = 10;
pub const MIDDLE_DIP: u8 = 11;
pub const MIDDLE_TIP: u8 = 12;
pub const RING_MCP: u8 = 13;
pub const RING_PIP: u8 = 14;
pub const RING_DIP: u8 = 15;
pub const RING_TIP: u8 = 16;
pub const PINKY_MCP: u8 = 17;
pub const PINKY_PIP: u8 = 18;
pub const PINKY_DIP: u8 = 19;
pub const PINKY_TIP: u8 = 20;

/// One tracked point on a hand.
///
/// `z` is relative depth. It is carried through to observers but does not
/// influence the pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A validated index into a hand's 21 landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LandmarkIndex(u8);

impl LandmarkIndex {
    /// Returns `None` when `index` is not in `0..=20`.
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < LANDMARK_COUNT).then_some(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for LandmarkIndex {
    fn default() -> Self {
        Self(MIDDLE_MCP)
    }
}

/// Shape problems found while reading a frame result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("hand has {found} landmarks, expected 21")]
    WrongLandmarkCount { found: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Everything the detector reported for one camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    /// Detected hands, each a sequence of landmarks. Empty when nothing was detected.
    #[serde(default, alias = "multiHandLandmarks")]
    pub hands: Vec<Vec<Landmark>>,
    /// Optional per-hand classification labels ("Left"/"Right").
    #[serde(default, skip_serializing_if = "Vec::is_empty", alias = "multiHandedness")]
    pub handedness: Vec<String>,
}

impl FrameResult {
    /// A frame with no detections.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame with a single hand.
    pub fn single(hand: Vec<Landmark>) -> Self {
        Self {
            hands: vec![hand],
            handedness: Vec::new(),
        }
    }

    pub fn has_hands(&self) -> bool {
        !self.hands.is_empty()
    }

    /// Read the pointer landmark from the first hand.
    ///
    /// Returns `Ok(None)` when the frame has no hands. The whole first hand is
    /// validated, not only the selected landmark, so a truncated or corrupt
    /// payload is rejected as a unit.
    pub fn primary_landmark(&self, index: LandmarkIndex) -> Result<Option<Landmark>, FrameError> {
        let Some(hand) = self.hands.first() else {
            return Ok(None);
        };

        if hand.len() != LANDMARK_COUNT {
            return Err(FrameError::WrongLandmarkCount { found: hand.len() });
        }
        if let Some(index) = hand.iter().position(|lm| !lm.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }

        Ok(Some(hand[usize::from(index.get())]))
    }
}

/// Build a full hand with every landmark at the same position.
///
/// Handy for tests and synthetic replays where only the pointer landmark matters.
pub fn uniform_hand(x: f32, y: f32) -> Vec<Landmark> {
    vec![Landmark::new(x, y, 0.0); LANDMARK_COUNT]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_accepts_full_range() {
        assert_eq!(LandmarkIndex::new(WRIST).map(LandmarkIndex::get), Some(0));
        assert_eq!(LandmarkIndex::new(PINKY_TIP).map(LandmarkIndex::get), Some(20));
        assert!(LandmarkIndex::new(21).is_none());
        assert!(LandmarkIndex::new(u8::MAX).is_none());
    }

    #[test]
    fn test_default_index_is_middle_finger_base() {
        assert_eq!(LandmarkIndex::default().get(), MIDDLE_MCP);
    }

    #[test]
    fn test_primary_landmark_none_without_hands() {
        let frame = FrameResult::empty();
        assert_eq!(frame.primary_landmark(LandmarkIndex::default()), Ok(None));
    }

    #[test]
    fn test_primary_landmark_reads_selected_point() {
        let mut hand = uniform_hand(0.1, 0.1);
        hand[usize::from(INDEX_TIP)] = Landmark::new(0.7, 0.3, -0.02);
        let frame = FrameResult::single(hand);

        let index = LandmarkIndex::new(INDEX_TIP).unwrap();
        let lm = frame.primary_landmark(index).unwrap().unwrap();
        assert_eq!(lm, Landmark::new(0.7, 0.3, -0.02));
    }

    #[test]
    fn test_primary_landmark_only_consults_first_hand() {
        let frame = FrameResult {
            hands: vec![uniform_hand(0.2, 0.2), vec![Landmark::default(); 3]],
            handedness: Vec::new(),
        };
        // The malformed second hand is ignored.
        let lm = frame.primary_landmark(LandmarkIndex::default()).unwrap();
        assert_eq!(lm.map(|l| l.x), Some(0.2));
    }

    #[test]
    fn test_primary_landmark_rejects_truncated_hand() {
        let frame = FrameResult::single(vec![Landmark::default(); 5]);
        assert_eq!(
            frame.primary_landmark(LandmarkIndex::default()),
            Err(FrameError::WrongLandmarkCount { found: 5 })
        );
    }

    #[test]
    fn test_primary_landmark_rejects_nan() {
        let mut hand = uniform_hand(0.5, 0.5);
        hand[3].y = f32::NAN;
        let frame = FrameResult::single(hand);
        assert_eq!(
            frame.primary_landmark(LandmarkIndex::default()),
            Err(FrameError::NonFinite { index: 3 })
        );
    }

    #[test]
    fn test_deserializes_detector_field_names() {
        let points: Vec<String> = (0..LANDMARK_COUNT)
            .map(|_| r#"{"x":0.25,"y":0.75}"#.to_string())
            .collect();
        let json = format!(
            r#"{{"multiHandLandmarks":[[{}]],"multiHandedness":["Right"]}}"#,
            points.join(",")
        );

        let frame: FrameResult = serde_json::from_str(&json).unwrap();
        assert_eq!(frame.hands.len(), 1);
        assert_eq!(frame.handedness, vec!["Right".to_string()]);
        // Missing z defaults to zero.
        assert_eq!(frame.hands[0][0], Landmark::new(0.25, 0.75, 0.0));
    }

    #[test]
    fn test_deserializes_empty_object_as_no_hands() {
        let frame: FrameResult = serde_json::from_str("{}").unwrap();
        assert!(!frame.has_hands());
    }
}
