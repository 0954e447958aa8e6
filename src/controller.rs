//! Pointer-driven editing on top of [`GraphModel`].
//!
//! The controller is a small state machine: the current [`Mode`] decides what
//! a primary press does, a single gesture slot holds either a node drag or a
//! view pan, and a context menu can be opened on any node or edge without
//! leaving the mode.

use std::fmt;

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::model::{Color, EdgeId, GraphModel, ModelError, NodeId, Point, SceneItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    AddNode,
    AddEdge,
    MoveNode,
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
    Middle,
}

/// Pointer input in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press { button: Button, at: Point },
    Move { at: Point },
    Release { button: Button, at: Point },
    /// Positive notches zoom in.
    Wheel { notches: i32, at: Point },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewOptions {
    pub zoom_step: f64,
    /// Extra slack around thin edges for hit testing, in scene units.
    pub hit_tolerance: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            zoom_step: 1.25,
            hit_tolerance: 3.0,
        }
    }
}

/// Maps view points to scene points: `view = scene * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub offset: Point,
    pub scale: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn to_scene(&self, view: Point) -> Point {
        Point::new(
            (view.x - self.offset.x) / self.scale,
            (view.y - self.offset.y) / self.scale,
        )
    }

    pub fn to_view(&self, scene: Point) -> Point {
        Point::new(
            scene.x * self.scale + self.offset.x,
            scene.y * self.scale + self.offset.y,
        )
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    /// Scales by `factor` keeping the scene point under `anchor` in place.
    pub fn zoom(&mut self, factor: f64, anchor: Point) {
        let fixed = self.to_scene(anchor);
        self.scale *= factor;
        self.offset = Point::new(
            anchor.x - fixed.x * self.scale,
            anchor.y - fixed.y * self.scale,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Drag { node: NodeId, grab: Point },
    Pan { button: Button, last: Point },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    ChangeNodeColor,
    ChangeLabelColor,
    ChangeNodeSize,
    DeleteNode,
    DeleteEdge,
    ChangeEdgeColor,
    ChangeEdgeThickness,
}

impl MenuEntry {
    pub const NODE: [MenuEntry; 4] = [
        MenuEntry::ChangeNodeColor,
        MenuEntry::ChangeLabelColor,
        MenuEntry::ChangeNodeSize,
        MenuEntry::DeleteNode,
    ];

    pub const EDGE: [MenuEntry; 3] = [
        MenuEntry::DeleteEdge,
        MenuEntry::ChangeEdgeColor,
        MenuEntry::ChangeEdgeThickness,
    ];
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuEntry::ChangeNodeColor => "Change Node Color",
            MenuEntry::ChangeLabelColor => "Change Label Color",
            MenuEntry::ChangeNodeSize => "Change Node Size",
            MenuEntry::DeleteNode => "Delete Node",
            MenuEntry::DeleteEdge => "Delete Edge",
            MenuEntry::ChangeEdgeColor => "Change Edge Color",
            MenuEntry::ChangeEdgeThickness => "Change Edge Thickness",
        })
    }
}

/// A menu entry together with the value picked for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuAction {
    NodeColor(Color),
    LabelColor(Color),
    NodeSize(f64),
    DeleteNode,
    DeleteEdge,
    EdgeColor(Color),
    EdgeThickness(f64),
}

impl MenuAction {
    pub fn entry(self) -> MenuEntry {
        match self {
            MenuAction::NodeColor(_) => MenuEntry::ChangeNodeColor,
            MenuAction::LabelColor(_) => MenuEntry::ChangeLabelColor,
            MenuAction::NodeSize(_) => MenuEntry::ChangeNodeSize,
            MenuAction::DeleteNode => MenuEntry::DeleteNode,
            MenuAction::DeleteEdge => MenuEntry::DeleteEdge,
            MenuAction::EdgeColor(_) => MenuEntry::ChangeEdgeColor,
            MenuAction::EdgeThickness(_) => MenuEntry::ChangeEdgeThickness,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub target: SceneItem,
    /// Where it was opened, in view coordinates.
    pub at: Point,
    pub entries: Vec<MenuEntry>,
}

/// Styling applied to every node or every edge at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphAction {
    NodeColor(Color),
    LabelColor(Color),
    NodeSize(f64),
    EdgeColor(Color),
    EdgeThickness(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Ignored,
    NodeAdded(NodeId),
    EdgePending(NodeId),
    EdgeCancelled,
    EdgeAdded(EdgeId),
    /// The pair was already connected.
    EdgeRejected,
    DragStarted(NodeId),
    NodeMoved(NodeId),
    DragEnded(NodeId),
    PanStarted,
    Panned,
    PanEnded,
    Zoomed(f64),
    MenuOpened(SceneItem),
    MenuClosed,
    NodeUpdated(NodeId),
    EdgeUpdated(EdgeId),
    NodeDeleted(NodeId),
    EdgeDeleted(EdgeId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("no context menu is open")]
    NoMenu,
    #[error("`{0}` is not offered for this item")]
    NotOffered(MenuEntry),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    mode: Mode,
    pending: Option<NodeId>,
    gesture: Option<Gesture>,
    menu: Option<ContextMenu>,
    view: ViewTransform,
    options: ViewOptions,
}

impl InteractionController {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Node waiting for the second click in [`Mode::AddEdge`].
    pub fn pending(&self) -> Option<NodeId> {
        self.pending
    }

    pub fn dragging(&self) -> Option<NodeId> {
        match self.gesture {
            Some(Gesture::Drag { node, .. }) => Some(node),
            _ => None,
        }
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Pan { .. }))
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Switching modes abandons any half-built edge, gesture or open menu.
    pub fn set_mode(&mut self, mode: Mode) {
        debug!("mode {:?} -> {mode:?}", self.mode);
        self.mode = mode;
        self.reset();
    }

    /// Drops transient state; used after the model was replaced wholesale.
    pub fn reset(&mut self) {
        self.pending = None;
        self.gesture = None;
        self.menu = None;
    }

    pub fn handle(&mut self, model: &mut GraphModel, event: PointerEvent) -> Outcome {
        match event {
            PointerEvent::Press { button, at } => self.press(model, button, at),
            PointerEvent::Move { at } => self.motion(model, at),
            PointerEvent::Release { button, .. } => self.release(button),
            PointerEvent::Wheel { notches, at } => {
                if notches == 0 {
                    return Outcome::Ignored;
                }
                self.view.zoom(self.options.zoom_step.powi(notches), at);
                Outcome::Zoomed(self.view.scale)
            }
        }
    }

    fn press(&mut self, model: &mut GraphModel, button: Button, at: Point) -> Outcome {
        if self.gesture.is_some() {
            return Outcome::Ignored;
        }
        let scene = self.view.to_scene(at);

        match button {
            Button::Secondary => match model.item_at(scene, self.options.hit_tolerance) {
                Some(target) => {
                    let entries = match target {
                        SceneItem::Node(_) => MenuEntry::NODE.to_vec(),
                        SceneItem::Edge(_) => MenuEntry::EDGE.to_vec(),
                    };
                    self.menu = Some(ContextMenu { target, at, entries });
                    Outcome::MenuOpened(target)
                }
                None => self.close_menu(),
            },
            Button::Middle => self.start_pan(button, at),
            Button::Primary => {
                if self.menu.is_some() {
                    return self.close_menu();
                }
                match self.mode {
                    Mode::Idle => Outcome::Ignored,
                    Mode::AddNode => Outcome::NodeAdded(model.add_node(scene)),
                    Mode::AddEdge => self.pick_endpoint(model, scene),
                    Mode::MoveNode => match model.node_at(scene).and_then(|id| model.node(id)) {
                        Some(node) => {
                            let grab = Point::new(scene.x - node.position.x, scene.y - node.position.y);
                            self.gesture = Some(Gesture::Drag { node: node.id, grab });
                            Outcome::DragStarted(node.id)
                        }
                        None => Outcome::Ignored,
                    },
                    Mode::Pan => self.start_pan(button, at),
                }
            }
        }
    }

    fn pick_endpoint(&mut self, model: &mut GraphModel, scene: Point) -> Outcome {
        let Some(clicked) = model.node_at(scene) else {
            return Outcome::Ignored;
        };
        match self.pending.take() {
            None => {
                self.pending = Some(clicked);
                Outcome::EdgePending(clicked)
            }
            Some(first) if first == clicked => Outcome::EdgeCancelled,
            Some(first) => match model.add_edge(first, clicked) {
                Some(edge) => Outcome::EdgeAdded(edge),
                None => Outcome::EdgeRejected,
            },
        }
    }

    fn start_pan(&mut self, button: Button, at: Point) -> Outcome {
        self.gesture = Some(Gesture::Pan { button, last: at });
        Outcome::PanStarted
    }

    fn motion(&mut self, model: &mut GraphModel, at: Point) -> Outcome {
        match self.gesture {
            Some(Gesture::Drag { node, grab }) => {
                let scene = self.view.to_scene(at);
                let target = Point::new(scene.x - grab.x, scene.y - grab.y);
                match model.move_node(node, target) {
                    Ok(()) => Outcome::NodeMoved(node),
                    Err(e) => {
                        debug!("drag ended: {e}");
                        self.gesture = None;
                        Outcome::Ignored
                    }
                }
            }
            Some(Gesture::Pan { button, last }) => {
                self.view.pan(at.x - last.x, at.y - last.y);
                self.gesture = Some(Gesture::Pan { button, last: at });
                Outcome::Panned
            }
            None => Outcome::Ignored,
        }
    }

    fn release(&mut self, button: Button) -> Outcome {
        match self.gesture {
            Some(Gesture::Drag { node, .. }) if button == Button::Primary => {
                self.gesture = None;
                Outcome::DragEnded(node)
            }
            Some(Gesture::Pan { button: started, .. }) if button == started => {
                self.gesture = None;
                Outcome::PanEnded
            }
            _ => Outcome::Ignored,
        }
    }

    fn close_menu(&mut self) -> Outcome {
        match self.menu.take() {
            Some(_) => Outcome::MenuClosed,
            None => Outcome::Ignored,
        }
    }

    /// Applies an entry of the open menu. The menu stays open on error.
    pub fn choose(
        &mut self,
        model: &mut GraphModel,
        action: MenuAction,
    ) -> Result<Outcome, ControllerError> {
        let menu = self.menu.as_ref().ok_or(ControllerError::NoMenu)?;
        if !menu.entries.contains(&action.entry()) {
            return Err(ControllerError::NotOffered(action.entry()));
        }

        let outcome = match (menu.target, action) {
            (SceneItem::Node(id), MenuAction::NodeColor(color)) => {
                model.set_node_color(id, color)?;
                Outcome::NodeUpdated(id)
            }
            (SceneItem::Node(id), MenuAction::LabelColor(color)) => {
                model.set_label_color(id, color)?;
                Outcome::NodeUpdated(id)
            }
            (SceneItem::Node(id), MenuAction::NodeSize(radius)) => {
                model.set_node_radius(id, radius)?;
                Outcome::NodeUpdated(id)
            }
            (SceneItem::Node(id), MenuAction::DeleteNode) => {
                model.delete_node(id).ok_or(ModelError::NodeNotFound(id))?;
                if self.pending == Some(id) {
                    self.pending = None;
                }
                if self.dragging() == Some(id) {
                    self.gesture = None;
                }
                Outcome::NodeDeleted(id)
            }
            (SceneItem::Edge(id), MenuAction::DeleteEdge) => {
                model.delete_edge(id).ok_or(ModelError::EdgeNotFound(id))?;
                Outcome::EdgeDeleted(id)
            }
            (SceneItem::Edge(id), MenuAction::EdgeColor(color)) => {
                model.set_edge_color(id, color)?;
                Outcome::EdgeUpdated(id)
            }
            (SceneItem::Edge(id), MenuAction::EdgeThickness(width)) => {
                model.set_edge_width(id, width)?;
                Outcome::EdgeUpdated(id)
            }
            _ => return Err(ControllerError::NotOffered(action.entry())),
        };
        self.menu = None;
        Ok(outcome)
    }

    /// Styles every node or edge at once; an empty target set is reported
    /// and leaves the model untouched.
    pub fn apply_to_all(
        &mut self,
        model: &mut GraphModel,
        action: GraphAction,
    ) -> Result<(), ControllerError> {
        let result = match action {
            GraphAction::NodeColor(color) => model.set_all_node_colors(color),
            GraphAction::LabelColor(color) => model.set_all_label_colors(color),
            GraphAction::NodeSize(radius) => model.set_all_node_radii(radius),
            GraphAction::EdgeColor(color) => model.set_all_edge_colors(color),
            GraphAction::EdgeThickness(width) => model.set_all_edge_widths(width),
        };
        if let Err(e) = &result {
            warn!("{e}");
        }
        Ok(result?)
    }
}
