use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;
use thiserror::Error;

pub const MIN_NODE_RADIUS: f64 = 20.0;
pub const MAX_NODE_RADIUS: f64 = 100.0;
pub const MIN_EDGE_WIDTH: f64 = 1.0;
pub const MAX_EDGE_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Distance from `self` to the segment `a`-`b`.
    pub fn distance_to_segment(self, a: Point, b: Point) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return self.distance(a);
        }
        let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
        self.distance(Point::new(a.x + t * dx, a.y + t * dy))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const PURPLE: Color = Color::rgb(174, 34, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid color `{0}`: expected #rrggbb or #rgb")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeStyle {
    pub radius: f64,
    pub color: Color,
    pub label_color: Color,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            radius: MIN_NODE_RADIUS,
            color: Color::PURPLE,
            label_color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f64,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: MIN_EDGE_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub radius: f64,
    pub color: Color,
    pub label_color: Color,
    edges: Vec<EdgeId>,
}

impl Node {
    /// Incident edges in insertion order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.position.distance(point) <= self.radius
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub color: Color,
    pub width: f64,
}

impl Edge {
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }

    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// Endpoints sorted so that `{a, b}` and `{b, a}` compare equal.
    pub fn canonical_pair(&self) -> (NodeId, NodeId) {
        if self.source <= self.target {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }
}

/// Anything addressable in the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneItem {
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("node radius {0} is outside [20, 100]")]
    RadiusOutOfRange(f64),
    #[error("edge width {0} is outside [1, 10]")]
    WidthOutOfRange(f64),
    #[error("there are no nodes in the graph")]
    NoNodes,
    #[error("there are no edges in the graph")]
    NoEdges,
}

type Listener = Box<dyn FnMut()>;

/// Undirected simple graph edited through the controller and the importers.
///
/// Nodes iterate in creation order because ids are allocated from a counter
/// that only resets when the whole graph is cleared. Every successful
/// mutation bumps [`GraphModel::revision`] once and calls each listener once.
pub struct GraphModel {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    next_node: u64,
    next_edge: u64,
    node_style: NodeStyle,
    edge_style: EdgeStyle,
    revision: u64,
    listeners: Vec<Listener>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphModel")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::with_styles(NodeStyle::default(), EdgeStyle::default())
    }

    pub fn with_styles(node_style: NodeStyle, edge_style: EdgeStyle) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_node: 0,
            next_edge: 0,
            node_style,
            edge_style,
            revision: 0,
            listeners: Vec::new(),
        }
    }

    pub fn on_modified(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node_style(&self) -> NodeStyle {
        self.node_style
    }

    pub fn edge_style(&self) -> EdgeStyle {
        self.edge_style
    }

    fn notify(&mut self) {
        self.revision += 1;
        for listener in &mut self.listeners {
            listener();
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn add_node(&mut self, position: Point) -> NodeId {
        self.add_node_styled(position, self.node_style)
    }

    pub fn add_node_styled(&mut self, position: Point, style: NodeStyle) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                position,
                radius: style.radius,
                color: style.color,
                label_color: style.label_color,
                edges: Vec::new(),
            },
        );
        debug!("added node {id} at ({}, {})", position.x, position.y);
        self.notify();
        id
    }

    /// Removes the node and all of its edges. Absent nodes are a no-op.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        let incident = self.nodes.get(&id)?.edges.clone();
        for edge in incident {
            self.detach_edge(edge);
        }
        let node = self.nodes.remove(&id)?;
        debug!("deleted node {id}");
        self.notify();
        Some(node)
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.add_edge_styled(a, b, self.edge_style)
    }

    /// Returns `None` without mutating for self-loops, unknown endpoints and
    /// pairs that are already connected.
    pub fn add_edge_styled(&mut self, a: NodeId, b: NodeId, style: EdgeStyle) -> Option<EdgeId> {
        if a == b || !self.nodes.contains_key(&a) || !self.nodes.contains_key(&b) {
            return None;
        }
        if self.find_edge(a, b).is_some() {
            debug!("edge {a} -- {b} already exists");
            return None;
        }
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                source: a,
                target: b,
                color: style.color,
                width: style.width,
            },
        );
        for end in [a, b] {
            if let Some(node) = self.nodes.get_mut(&end) {
                node.edges.push(id);
            }
        }
        debug!("added edge {id}: {a} -- {b}");
        self.notify();
        Some(id)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.detach_edge(id)?;
        debug!("deleted edge {id}");
        self.notify();
        Some(edge)
    }

    fn detach_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        for end in [edge.source, edge.target] {
            if let Some(node) = self.nodes.get_mut(&end) {
                node.edges.retain(|&e| e != id);
            }
        }
        Some(edge)
    }

    pub fn clear_all(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.next_node = 0;
        self.next_edge = 0;
        debug!("cleared graph");
        self.notify();
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<(), ModelError> {
        self.node_mut(id)?.position = position;
        self.notify();
        Ok(())
    }

    pub fn set_node_color(&mut self, id: NodeId, color: Color) -> Result<(), ModelError> {
        self.node_mut(id)?.color = color;
        self.notify();
        Ok(())
    }

    pub fn set_label_color(&mut self, id: NodeId, color: Color) -> Result<(), ModelError> {
        self.node_mut(id)?.label_color = color;
        self.notify();
        Ok(())
    }

    pub fn set_node_radius(&mut self, id: NodeId, radius: f64) -> Result<(), ModelError> {
        check_radius(radius)?;
        self.node_mut(id)?.radius = radius;
        self.notify();
        Ok(())
    }

    pub fn set_edge_color(&mut self, id: EdgeId, color: Color) -> Result<(), ModelError> {
        self.edge_mut(id)?.color = color;
        self.notify();
        Ok(())
    }

    pub fn set_edge_width(&mut self, id: EdgeId, width: f64) -> Result<(), ModelError> {
        check_width(width)?;
        self.edge_mut(id)?.width = width;
        self.notify();
        Ok(())
    }

    pub fn set_all_node_colors(&mut self, color: Color) -> Result<(), ModelError> {
        self.update_all_nodes(|node| node.color = color)
    }

    pub fn set_all_label_colors(&mut self, color: Color) -> Result<(), ModelError> {
        self.update_all_nodes(|node| node.label_color = color)
    }

    pub fn set_all_node_radii(&mut self, radius: f64) -> Result<(), ModelError> {
        check_radius(radius)?;
        self.update_all_nodes(|node| node.radius = radius)
    }

    pub fn set_all_edge_colors(&mut self, color: Color) -> Result<(), ModelError> {
        self.update_all_edges(|edge| edge.color = color)
    }

    pub fn set_all_edge_widths(&mut self, width: f64) -> Result<(), ModelError> {
        check_width(width)?;
        self.update_all_edges(|edge| edge.width = width)
    }

    fn update_all_nodes(&mut self, mut apply: impl FnMut(&mut Node)) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::NoNodes);
        }
        self.nodes.values_mut().for_each(&mut apply);
        self.notify();
        Ok(())
    }

    fn update_all_edges(&mut self, mut apply: impl FnMut(&mut Edge)) -> Result<(), ModelError> {
        if self.edges.is_empty() {
            return Err(ModelError::NoEdges);
        }
        self.edges.values_mut().for_each(&mut apply);
        self.notify();
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ModelError> {
        self.nodes.get_mut(&id).ok_or(ModelError::NodeNotFound(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge, ModelError> {
        self.edges.get_mut(&id).ok_or(ModelError::EdgeNotFound(id))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
            .values()
            .map(Edge::canonical_pair)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn degree(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id).map(Node::degree)
    }

    pub fn density(&self) -> Option<f64> {
        let n = self.node_count() as f64;
        (self.node_count() > 1).then(|| 2.0 * self.edge_count() as f64 / (n * (n - 1.0)))
    }

    pub fn average_degree(&self) -> Option<f64> {
        let n = self.node_count() as f64;
        (self.node_count() > 0).then(|| 2.0 * self.edge_count() as f64 / n)
    }

    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.edges
            .iter()
            .filter_map(|e| self.edges.get(e))
            .map(|e| e.other(id))
            .filter(|n| seen.insert(*n))
            .collect()
    }

    pub fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        let node = self.nodes.get(&a)?;
        node.edges
            .iter()
            .copied()
            .find(|e| self.edges.get(e).is_some_and(|edge| edge.connects(a, b)))
    }

    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(Point, Point)> {
        let edge = self.edges.get(&id)?;
        let source = self.nodes.get(&edge.source)?;
        let target = self.nodes.get(&edge.target)?;
        Some((source.position, target.position))
    }

    /// Topmost node under `point`; later nodes are drawn above earlier ones.
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .values()
            .rev()
            .find(|node| node.contains(point))
            .map(|node| node.id)
    }

    pub fn edge_at(&self, point: Point, tolerance: f64) -> Option<EdgeId> {
        self.edges.values().rev().find_map(|edge| {
            let (a, b) = self.edge_endpoints(edge.id)?;
            let reach = (edge.width / 2.0).max(tolerance);
            (point.distance_to_segment(a, b) <= reach).then_some(edge.id)
        })
    }

    pub fn item_at(&self, point: Point, tolerance: f64) -> Option<SceneItem> {
        self.node_at(point)
            .map(SceneItem::Node)
            .or_else(|| self.edge_at(point, tolerance).map(SceneItem::Edge))
    }
}

fn check_radius(radius: f64) -> Result<(), ModelError> {
    if (MIN_NODE_RADIUS..=MAX_NODE_RADIUS).contains(&radius) {
        Ok(())
    } else {
        Err(ModelError::RadiusOutOfRange(radius))
    }
}

fn check_width(width: f64) -> Result<(), ModelError> {
    if (MIN_EDGE_WIDTH..=MAX_EDGE_WIDTH).contains(&width) {
        Ok(())
    } else {
        Err(ModelError::WidthOutOfRange(width))
    }
}
