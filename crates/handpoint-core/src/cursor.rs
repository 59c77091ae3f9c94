//! Pointer visual presenter.
//!
//! Owns exactly one pointer element plus the stylesheet that animates its
//! dwell-progress ring. The ring's duration is the configured hover delay, so
//! the animation completes when the activation fires.

use std::time::Duration;

use crate::host::{
    ElementId, ElementRole, Host, NewElement, CURSOR_CLASS, HOVER_DELAY_PROPERTY, LOADING_CLASS,
};
use crate::mapping::ScreenPoint;

/// Rules injected next to the pointer. `--hover-delay` is set on the pointer
/// itself when a dwell starts.
pub const CURSOR_STYLESHEET: &str = "\
.force-cursor { position: fixed; width: 20px; height: 20px; border-radius: 50%; \
pointer-events: none; z-index: 9999; transform: translate(-50%, -50%); }
.force-cursor.force-loading::before { content: ''; position: absolute; top: -10px; left: -10px; \
width: 40px; height: 40px; border-radius: 50%; border: 5px solid rgba(0, 0, 255, 0.5); \
border-top-color: blue; animation: force-spin var(--hover-delay, 2s) linear forwards; }
@keyframes force-spin { to { transform: rotate(360deg); } }";

/// Presenter state for the pointer visual.
#[derive(Debug)]
pub struct CursorPresenter {
    image_url: Option<String>,
    hover_delay: Duration,
    pointer: Option<ElementId>,
    stylesheet: Option<ElementId>,
    dwelling: bool,
}

impl CursorPresenter {
    pub fn new(image_url: Option<String>, hover_delay: Duration) -> Self {
        Self {
            image_url,
            hover_delay,
            pointer: None,
            stylesheet: None,
            dwelling: false,
        }
    }

    /// Create the pointer and its stylesheet. Idempotent.
    pub fn create<H: Host + ?Sized>(&mut self, host: &mut H) -> ElementId {
        if let Some(pointer) = self.pointer {
            return pointer;
        }

        let stylesheet = host.create_element(
            NewElement::new(ElementRole::StyleSheet).with_content(CURSOR_STYLESHEET),
        );
        let pointer = host.create_element(
            NewElement::new(ElementRole::Pointer)
                .with_class(CURSOR_CLASS)
                .with_image(self.image_url.clone()),
        );

        self.stylesheet = Some(stylesheet);
        self.pointer = Some(pointer);
        self.dwelling = false;
        pointer
    }

    /// Move the pointer. No-op before `create`.
    pub fn update<H: Host + ?Sized>(&mut self, host: &mut H, position: ScreenPoint) {
        if let Some(pointer) = self.pointer {
            host.move_element(pointer, position);
        }
    }

    /// Switch the dwell-progress indication on or off.
    pub fn set_dwelling<H: Host + ?Sized>(&mut self, host: &mut H, dwelling: bool) {
        let Some(pointer) = self.pointer else {
            return;
        };
        if dwelling == self.dwelling {
            return;
        }

        if dwelling {
            let value = format!("{}ms", self.hover_delay.as_millis());
            host.set_property(pointer, HOVER_DELAY_PROPERTY, &value);
            host.add_class(pointer, LOADING_CLASS);
        } else {
            host.remove_class(pointer, LOADING_CLASS);
        }
        self.dwelling = dwelling;
    }

    /// Remove the pointer and stylesheet. Safe to call repeatedly.
    pub fn destroy<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(pointer) = self.pointer.take() {
            host.remove_element(pointer);
        }
        if let Some(stylesheet) = self.stylesheet.take() {
            host.remove_element(stylesheet);
        }
        self.dwelling = false;
    }

    pub fn pointer(&self) -> Option<ElementId> {
        self.pointer
    }

    pub fn is_dwelling(&self) -> bool {
        self.dwelling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Viewport;
    use crate::scene::Scene;

    fn setup() -> (Scene, CursorPresenter) {
        (
            Scene::new(Viewport::new(800.0, 600.0)),
            CursorPresenter::new(None, Duration::from_millis(750)),
        )
    }

    #[test]
    fn test_create_is_idempotent() {
        let (mut scene, mut cursor) = setup();
        let first = cursor.create(&mut scene);
        let second = cursor.create(&mut scene);

        assert_eq!(first, second);
        assert_eq!(scene.count_role(ElementRole::Pointer), 1);
        assert_eq!(scene.count_role(ElementRole::StyleSheet), 1);
    }

    #[test]
    fn test_pointer_hidden_until_first_update() {
        let (mut scene, mut cursor) = setup();
        let pointer = cursor.create(&mut scene);
        assert!(!scene.node(pointer).unwrap().visible);

        cursor.update(&mut scene, ScreenPoint::new(40.0, 60.0));
        let node = scene.node(pointer).unwrap();
        assert!(node.visible);
        assert_eq!(node.position, Some(ScreenPoint::new(40.0, 60.0)));

        // Moving again keeps the same element.
        cursor.update(&mut scene, ScreenPoint::new(41.0, 61.0));
        assert_eq!(cursor.pointer(), Some(pointer));
        assert_eq!(scene.count_role(ElementRole::Pointer), 1);
    }

    #[test]
    fn test_update_before_create_is_noop() {
        let (mut scene, mut cursor) = setup();
        cursor.update(&mut scene, ScreenPoint::new(1.0, 1.0));
        assert_eq!(scene.count_role(ElementRole::Pointer), 0);
    }

    #[test]
    fn test_dwelling_toggles_loading_class_and_duration() {
        let (mut scene, mut cursor) = setup();
        let pointer = cursor.create(&mut scene);

        cursor.set_dwelling(&mut scene, true);
        assert!(scene.has_class(pointer, LOADING_CLASS));
        assert_eq!(
            scene.node(pointer).unwrap().properties.get(HOVER_DELAY_PROPERTY).map(String::as_str),
            Some("750ms")
        );
        assert!(cursor.is_dwelling());

        cursor.set_dwelling(&mut scene, false);
        assert!(!scene.has_class(pointer, LOADING_CLASS));
        assert!(!cursor.is_dwelling());
    }

    #[test]
    fn test_custom_image_is_applied() {
        let mut scene = Scene::new(Viewport::default());
        let mut cursor = CursorPresenter::new(Some("/hand.png".into()), Duration::from_secs(1));
        let pointer = cursor.create(&mut scene);
        assert_eq!(
            scene.node(pointer).unwrap().image_url.as_deref(),
            Some("/hand.png")
        );
    }

    #[test]
    fn test_destroy_removes_everything_and_is_repeatable() {
        let (mut scene, mut cursor) = setup();
        cursor.create(&mut scene);
        cursor.set_dwelling(&mut scene, true);

        cursor.destroy(&mut scene);
        cursor.destroy(&mut scene);

        assert_eq!(scene.count_role(ElementRole::Pointer), 0);
        assert_eq!(scene.count_role(ElementRole::StyleSheet), 0);
        assert!(cursor.pointer().is_none());
        assert!(!cursor.is_dwelling());

        // A new pointer can be created after destroy.
        cursor.create(&mut scene);
        assert_eq!(scene.count_role(ElementRole::Pointer), 1);
    }
}
