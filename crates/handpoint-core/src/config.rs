//! Tracker, detector, and capture configuration.
//!
//! All structs deserialize from camelCase JSON with every field optional, so a
//! config file only needs to name what it changes. Validation happens once,
//! at session construction, rather than on every frame.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::landmark::{LandmarkIndex, MIDDLE_MCP};

/// Default dwell duration before an activation fires.
pub const DEFAULT_HOVER_DELAY_MS: u64 = 2000;

/// Per-session pointer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Which of the 21 landmarks drives the pointer.
    pub cursor_landmark_index: u8,
    /// Dwell duration required to trigger an activation.
    #[serde(alias = "hoverDelay")]
    pub hover_delay_ms: u64,
    /// Amplification of horizontal displacement from screen center.
    pub sensitivity_x: f32,
    /// Amplification of vertical displacement from screen center.
    pub sensitivity_y: f32,
    /// Custom pointer imagery. `None` uses the default dot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_image_url: Option<String>,
    /// Show the diagnostic overlay while tracking.
    pub debug: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cursor_landmark_index: MIDDLE_MCP,
            hover_delay_ms: DEFAULT_HOVER_DELAY_MS,
            sensitivity_x: 1.0,
            sensitivity_y: 1.0,
            cursor_image_url: None,
            debug: false,
        }
    }
}

impl TrackerConfig {
    /// Check every field and return the validated pointer landmark.
    pub fn validate(&self) -> Result<LandmarkIndex, TrackerError> {
        let index = LandmarkIndex::new(self.cursor_landmark_index)
            .ok_or_else(|| TrackerError::landmark_index_out_of_range(self.cursor_landmark_index))?;

        if self.hover_delay_ms == 0 {
            return Err(TrackerError::invalid_config(
                "hoverDelayMs must be greater than zero",
            ));
        }

        for (name, value) in [
            ("sensitivityX", self.sensitivity_x),
            ("sensitivityY", self.sensitivity_y),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackerError::invalid_config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if let Some(url) = &self.cursor_image_url {
            if url.trim().is_empty() {
                return Err(TrackerError::invalid_config(
                    "cursorImageUrl must not be empty when set",
                ));
            }
        }

        Ok(index)
    }

    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }
}

/// Options the session hands to the external hand detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorOptions {
    pub max_hands: u8,
    /// 0 = lite model, 1 = full model.
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_hands: 2,
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl DetectorOptions {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.max_hands == 0 {
            return Err(TrackerError::detector_failed("maxHands must be at least 1"));
        }
        if self.model_complexity > 1 {
            return Err(TrackerError::detector_failed(&format!(
                "modelComplexity must be 0 or 1, got {}",
                self.model_complexity
            )));
        }
        for (name, value) in [
            ("minDetectionConfidence", self.min_detection_confidence),
            ("minTrackingConfidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::detector_failed(&format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Target resolution and rate requested from the capture source.
///
/// Not semantically significant to the pipeline beyond "frames arrive".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureOptions {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}

impl CaptureOptions {
    /// Interval between frames at the configured rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        let index = config.validate().unwrap();
        assert_eq!(index.get(), MIDDLE_MCP);
        assert_eq!(config.hover_delay(), Duration::from_millis(2000));
        assert!(DetectorOptions::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_landmark_index_out_of_range() {
        let config = TrackerConfig {
            cursor_landmark_index: 21,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
        assert!(err.message.contains("21"));
    }

    #[test]
    fn test_rejects_zero_hover_delay() {
        let config = TrackerConfig {
            hover_delay_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_sensitivity() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = TrackerConfig {
                sensitivity_y: bad,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.message.contains("sensitivityY"), "value {bad}");
        }
    }

    #[test]
    fn test_rejects_blank_cursor_image() {
        let config = TrackerConfig {
            cursor_image_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"hoverDelay": 500, "sensitivityX": 1.5}"#).unwrap();
        assert_eq!(config.hover_delay_ms, 500);
        assert_eq!(config.sensitivity_x, 1.5);
        assert_eq!(config.sensitivity_y, 1.0);
        assert_eq!(config.cursor_landmark_index, MIDDLE_MCP);
        assert!(!config.debug);
    }

    #[test]
    fn test_serializes_camel_case_and_skips_missing_image() {
        let json = serde_json::to_string(&TrackerConfig::default()).unwrap();
        assert!(json.contains("\"cursorLandmarkIndex\":9"));
        assert!(json.contains("\"hoverDelayMs\":2000"));
        assert!(!json.contains("cursorImageUrl"));
    }

    #[test]
    fn test_detector_options_reject_out_of_range_confidence() {
        let opts = DetectorOptions {
            min_tracking_confidence: 1.5,
            ..Default::default()
        };
        let err = opts.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::DetectorFailed);
        assert!(err.message.contains("minTrackingConfidence"));
    }

    #[test]
    fn test_detector_options_reject_zero_hands() {
        let opts = DetectorOptions {
            max_hands: 0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_capture_frame_interval() {
        let opts = CaptureOptions::default();
        assert_eq!(opts.frame_interval(), Duration::from_secs(1) / 30);

        let zero = CaptureOptions {
            frame_rate: 0,
            ..Default::default()
        };
        assert_eq!(zero.frame_interval(), Duration::from_secs(1));
    }
}
