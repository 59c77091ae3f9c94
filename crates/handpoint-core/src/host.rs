//! Host environment capability trait.
//!
//! Everything the pipeline does to the display goes through [`Host`]: point
//! resolution, class mutation, element creation and removal, and activation
//! dispatch. Production adapters bind it to a real display tree; tests and the
//! CLI use [`crate::scene::Scene`].
//!
//! # Markers
//!
//! Elements opt into hover/activation with either the
//! [`HOVERABLE_ATTRIBUTE`] attribute or the [`HOVERABLE_CLASS`] class. While a
//! dwell is in progress the target carries [`HOVERED_CLASS`].

use serde::{Deserialize, Serialize};

use crate::mapping::{ScreenPoint, Viewport};

/// Attribute marking an element as interactive.
pub const HOVERABLE_ATTRIBUTE: &str = "data-hoverable";
/// Class marking an element as interactive.
pub const HOVERABLE_CLASS: &str = "force-hoverable";
/// Class added to the target element during a dwell.
pub const HOVERED_CLASS: &str = "force-hover";
/// Class carried by the pointer visual.
pub const CURSOR_CLASS: &str = "force-cursor";
/// Class added to the pointer while a dwell is in progress.
pub const LOADING_CLASS: &str = "force-loading";
/// Pointer property holding the dwell-progress animation duration.
pub const HOVER_DELAY_PROPERTY: &str = "--hover-delay";

/// Opaque handle to an element owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a created element is for.
///
/// All of these are invisible to hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    /// The on-screen pointer.
    Pointer,
    /// An injected style resource.
    StyleSheet,
    /// The debug overlay showing the camera feed and landmarks.
    DiagnosticOverlay,
}

/// Request to create an element.
#[derive(Debug, Clone, PartialEq)]
pub struct NewElement {
    pub role: ElementRole,
    pub classes: Vec<String>,
    /// Background image for pointer visuals.
    pub image_url: Option<String>,
    /// Text content, e.g. stylesheet rules.
    pub content: Option<String>,
}

impl NewElement {
    pub fn new(role: ElementRole) -> Self {
        Self {
            role,
            classes: Vec::new(),
            image_url: None,
            content: None,
        }
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Capabilities the pipeline needs from the display environment.
///
/// Operations on an unknown or already-removed element must be no-ops;
/// the hover machine can hold a handle to an element the application removed.
pub trait Host {
    /// Current viewport size in pixels.
    fn viewport(&self) -> Viewport;

    /// Topmost hit-testable element at `point`, if any.
    fn element_at(&self, point: ScreenPoint) -> Option<ElementId>;

    /// Parent of `id` in the display tree.
    fn parent_of(&self, id: ElementId) -> Option<ElementId>;

    /// Whether `id` carries `marker` as an attribute or a class.
    fn has_marker(&self, id: ElementId, marker: &str) -> bool;

    fn add_class(&mut self, id: ElementId, class: &str);

    fn remove_class(&mut self, id: ElementId, class: &str);

    /// Set a style property (e.g. a CSS custom property) on `id`.
    fn set_property(&mut self, id: ElementId, name: &str, value: &str);

    /// Create an element and attach it to the display.
    fn create_element(&mut self, element: NewElement) -> ElementId;

    /// Detach and drop an element.
    fn remove_element(&mut self, id: ElementId);

    /// Move a positioned element and make it visible.
    fn move_element(&mut self, id: ElementId, position: ScreenPoint);

    /// Fire a synthetic primary action (a click) on `id`.
    fn dispatch_activation(&mut self, id: ElementId);
}
