//! In-memory host implementation.
//!
//! A [`Scene`] is a flat list of nodes in paint order with parent links.
//! Later nodes paint above earlier ones, so hit-testing walks the list
//! backwards. Nodes created through [`Host::create_element`] (pointer,
//! stylesheet, overlay) never take part in hit-testing, like
//! `pointer-events: none` in a browser.
//!
//! Scenes can be described in JSON:
//!
//! ```json
//! {
//!   "viewport": { "width": 1280, "height": 720 },
//!   "elements": [
//!     { "name": "play", "bounds": { "x": 100, "y": 100, "width": 120, "height": 40 },
//!       "hoverable": true,
//!       "children": [
//!         { "name": "play-icon", "bounds": { "x": 105, "y": 105, "width": 30, "height": 30 } }
//!       ] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::host::{ElementId, ElementRole, Host, NewElement, HOVERABLE_ATTRIBUTE};
use crate::mapping::{ScreenPoint, Viewport};

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// One element in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: ElementId,
    pub name: Option<String>,
    pub parent: Option<ElementId>,
    /// Layout box for content nodes. Created nodes have none.
    pub bounds: Option<Rect>,
    /// Set for nodes created through [`Host::create_element`].
    pub role: Option<ElementRole>,
    pub attributes: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    pub image_url: Option<String>,
    pub content: Option<String>,
    /// Position of a moved node (pointer).
    pub position: Option<ScreenPoint>,
    pub visible: bool,
}

impl SceneNode {
    fn hit_testable(&self) -> bool {
        self.role.is_none() && self.visible
    }
}

/// An activation delivered to a scene element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationRecord {
    pub element: ElementId,
    pub name: Option<String>,
}

type ActivationListener = Box<dyn FnMut(&ActivationRecord) + Send>;

/// In-memory display tree.
pub struct Scene {
    viewport: Viewport,
    nodes: Vec<SceneNode>,
    next_id: u64,
    activations: Vec<ActivationRecord>,
    listener: Option<ActivationListener>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("viewport", &self.viewport)
            .field("nodes", &self.nodes.len())
            .field("activations", &self.activations.len())
            .finish()
    }
}

impl Scene {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            nodes: Vec::new(),
            next_id: 1,
            activations: Vec::new(),
            listener: None,
        }
    }

    /// Build a scene from a parsed layout.
    pub fn from_layout(layout: &SceneLayout) -> Self {
        let mut scene = Self::new(layout.viewport);
        for spec in &layout.elements {
            scene.add_spec(None, spec);
        }
        scene
    }

    fn add_spec(&mut self, parent: Option<ElementId>, spec: &ElementSpec) {
        let id = self.push_content(parent, spec.name.clone(), spec.bounds);
        if spec.hoverable {
            self.set_attribute(id, HOVERABLE_ATTRIBUTE, "true");
        }
        for class in &spec.classes {
            self.add_class(id, class);
        }
        for child in &spec.children {
            self.add_spec(Some(id), child);
        }
    }

    fn alloc_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push_content(
        &mut self,
        parent: Option<ElementId>,
        name: Option<String>,
        bounds: Rect,
    ) -> ElementId {
        let id = self.alloc_id();
        self.nodes.push(SceneNode {
            id,
            name,
            parent,
            bounds: Some(bounds),
            role: None,
            attributes: BTreeMap::new(),
            classes: BTreeSet::new(),
            properties: BTreeMap::new(),
            image_url: None,
            content: None,
            position: None,
            visible: true,
        });
        id
    }

    /// Add a plain top-level element.
    pub fn add_element(&mut self, name: &str, bounds: Rect) -> ElementId {
        self.push_content(None, Some(name.to_string()), bounds)
    }

    /// Add a top-level element carrying the interactive marker.
    pub fn add_hoverable(&mut self, name: &str, bounds: Rect) -> ElementId {
        let id = self.add_element(name, bounds);
        self.set_attribute(id, HOVERABLE_ATTRIBUTE, "true");
        id
    }

    /// Add a plain element nested under `parent`.
    pub fn add_child(&mut self, parent: ElementId, name: &str, bounds: Rect) -> ElementId {
        self.push_content(Some(parent), Some(name.to_string()), bounds)
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn node(&self, id: ElementId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Look up a content element by name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .find(|n| n.name.as_deref() == Some(name))
            .map(|n| n.id)
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.node(id).is_some_and(|n| n.classes.contains(class))
    }

    /// Number of live nodes created with `role`.
    pub fn count_role(&self, role: ElementRole) -> usize {
        self.nodes.iter().filter(|n| n.role == Some(role)).count()
    }

    pub fn activation_count(&self, id: ElementId) -> usize {
        self.activations.iter().filter(|a| a.element == id).count()
    }

    pub fn activations(&self) -> &[ActivationRecord] {
        &self.activations
    }

    /// Register a callback invoked for every activation. Replaces any previous one.
    pub fn on_activation(&mut self, listener: impl FnMut(&ActivationRecord) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Remove a node and every descendant.
    fn remove_subtree(&mut self, id: ElementId) {
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                self.nodes
                    .iter()
                    .filter(|n| n.parent == Some(parent))
                    .map(|n| n.id),
            );
            i += 1;
        }
        self.nodes.retain(|n| !doomed.contains(&n.id));
    }
}

impl Host for Scene {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn element_at(&self, point: ScreenPoint) -> Option<ElementId> {
        if !self.viewport.contains(point) {
            return None;
        }
        self.nodes
            .iter()
            .rev()
            .filter(|n| n.hit_testable())
            .find(|n| n.bounds.is_some_and(|b| b.contains(point)))
            .map(|n| n.id)
    }

    fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).and_then(|n| n.parent)
    }

    fn has_marker(&self, id: ElementId, marker: &str) -> bool {
        self.node(id)
            .is_some_and(|n| n.attributes.contains_key(marker) || n.classes.contains(marker))
    }

    fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.remove(class);
        }
    }

    fn set_property(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.properties.insert(name.to_string(), value.to_string());
        }
    }

    fn create_element(&mut self, element: NewElement) -> ElementId {
        let id = self.alloc_id();
        // Pointers stay hidden until first positioned.
        let visible = element.role != ElementRole::Pointer;
        self.nodes.push(SceneNode {
            id,
            name: None,
            parent: None,
            bounds: None,
            role: Some(element.role),
            attributes: BTreeMap::new(),
            classes: element.classes.into_iter().collect(),
            properties: BTreeMap::new(),
            image_url: element.image_url,
            content: element.content,
            position: None,
            visible,
        });
        id
    }

    fn remove_element(&mut self, id: ElementId) {
        self.remove_subtree(id);
    }

    fn move_element(&mut self, id: ElementId, position: ScreenPoint) {
        if let Some(node) = self.node_mut(id) {
            node.position = Some(position);
            node.visible = true;
        }
    }

    fn dispatch_activation(&mut self, id: ElementId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let record = ActivationRecord {
            element: id,
            name: node.name.clone(),
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(&record);
        }
        self.activations.push(record);
    }
}

/// JSON description of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLayout {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

/// JSON description of one element and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub bounds: Rect,
    #[serde(default)]
    pub hoverable: bool,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}
