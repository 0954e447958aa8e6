//! Turning graph-library snippets back into an editor graph.
//!
//! Each dialect interprets the snippet into an [`ImportedGraph`]; only a graph
//! that validated completely is written into the model.

mod graph_tool;
mod igraph;
mod networkx;
mod pygraphviz;
mod pyvis;

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::dialect::Dialect;
use crate::error::{ImportError, StructuralError};
use crate::interp::{Limits, Value};
use crate::layout;
use crate::model::{
    Color, EdgeStyle, GraphModel, MAX_EDGE_WIDTH, MAX_NODE_RADIUS, MIN_EDGE_WIDTH,
    MIN_NODE_RADIUS, NodeStyle, Point,
};
use crate::snippet_parser::parse_snippet;

/// Snippet data and graph edges allowed per node of the node limit.
pub const ITEMS_PER_NODE: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportOptions {
    pub enabled: Vec<Dialect>,
    pub max_statements: usize,
    pub max_nodes: usize,
    /// Radius of the circle used when a snippet carries no positions.
    pub layout_radius: f64,
    pub layout_center: [f64; 2],
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            enabled: Dialect::IMPORTABLE.to_vec(),
            max_statements: 10_000,
            max_nodes: 10_000,
            layout_radius: 200.0,
            layout_center: [300.0, 300.0],
        }
    }
}

impl ImportOptions {
    pub fn limits(&self) -> Limits {
        Limits {
            max_statements: self.max_statements,
            max_nodes: self.max_nodes,
            max_items: self.max_items(),
        }
    }

    /// Bound on snippet data and on the edges of one graph.
    pub fn max_items(&self) -> usize {
        self.max_nodes.saturating_mul(ITEMS_PER_NODE)
    }

    pub fn auto_layout(&self, count: usize) -> Vec<Point> {
        let [x, y] = self.layout_center;
        layout::circular(count, Point::new(x, y), self.layout_radius)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNode {
    pub key: String,
    pub position: Point,
    pub color: Option<Color>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedEdge {
    pub source: String,
    pub target: String,
    pub color: Option<Color>,
    pub width: Option<f64>,
}

impl ImportedEdge {
    pub fn new(source: String, target: String) -> Self {
        Self {
            source,
            target,
            color: None,
            width: None,
        }
    }
}

/// A fully resolved graph, ready to replace the model's contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedGraph {
    pub nodes: Vec<ImportedNode>,
    pub edges: Vec<ImportedEdge>,
}

impl ImportedGraph {
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.nodes.is_empty() {
            return Err(StructuralError::NoNodes);
        }
        let mut keys = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !keys.insert(node.key.as_str()) {
                return Err(StructuralError::DuplicateNode(node.key.clone()));
            }
        }
        for edge in &self.edges {
            if !keys.contains(edge.source.as_str()) || !keys.contains(edge.target.as_str()) {
                return Err(StructuralError::UnknownEndpoint {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Detects the dialect of `source` and imports it into `model`.
pub fn import_snippet(
    source: &str,
    model: &mut GraphModel,
    options: &ImportOptions,
) -> Result<Dialect, ImportError> {
    let Some(dialect) = Dialect::detect(source) else {
        let supported: Vec<&str> = options.enabled.iter().map(|d| d.key()).collect();
        return Err(ImportError::UnknownDialect {
            supported: supported.join(", "),
        });
    };
    import_as(dialect, source, model, options)?;
    Ok(dialect)
}

/// Replaces the contents of `model` with the graph `source` builds. On error
/// the model is left untouched.
pub fn import_as(
    dialect: Dialect,
    source: &str,
    model: &mut GraphModel,
    options: &ImportOptions,
) -> Result<(), ImportError> {
    let graph = interpret(dialect, source, options)?;
    commit(&graph, model);
    info!(
        "imported {} graph: {} nodes, {} edges",
        dialect,
        model.node_count(),
        model.edge_count()
    );
    Ok(())
}

/// Interprets and validates `source` without touching any model.
pub fn interpret(
    dialect: Dialect,
    source: &str,
    options: &ImportOptions,
) -> Result<ImportedGraph, ImportError> {
    if !dialect.supports_import() {
        return Err(export_only(dialect));
    }
    if !options.enabled.contains(&dialect) {
        return Err(ImportError::UnavailableDialect {
            dialect,
            reason: "it is disabled in the import configuration".to_string(),
        });
    }

    let snippet = parse_snippet(source).map_err(ImportError::Execution)?;
    let graph = match dialect {
        Dialect::NetworkX => networkx::interpret(&snippet, options)?,
        Dialect::Igraph => igraph::interpret(&snippet, options)?,
        Dialect::PyVis => pyvis::interpret(&snippet, options)?,
        Dialect::GraphTool => graph_tool::interpret(&snippet, options)?,
        Dialect::PyGraphviz => pygraphviz::interpret(&snippet, options)?,
        Dialect::Dgl | Dialect::Snap => return Err(export_only(dialect)),
    };
    graph.validate()?;
    Ok(graph)
}

fn export_only(dialect: Dialect) -> ImportError {
    ImportError::UnavailableDialect {
        dialect,
        reason: "it is an export-only format".to_string(),
    }
}

/// Clears `model` and replays `graph` into it: nodes in order, then edges.
pub fn commit(graph: &ImportedGraph, model: &mut GraphModel) {
    model.clear_all();
    let node_style = model.node_style();
    let edge_style = model.edge_style();

    let mut ids = HashMap::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        let style = NodeStyle {
            radius: node.radius.map_or(node_style.radius, |r| {
                clamp_logged(r, MIN_NODE_RADIUS, MAX_NODE_RADIUS, "radius", &node.key)
            }),
            color: node.color.unwrap_or(node_style.color),
            label_color: node_style.label_color,
        };
        let id = model.add_node_styled(node.position, style);
        ids.insert(node.key.as_str(), id);
    }

    for edge in &graph.edges {
        let (Some(&a), Some(&b)) = (ids.get(edge.source.as_str()), ids.get(edge.target.as_str()))
        else {
            continue;
        };
        if a == b {
            warn!("dropping self-loop on node {}", edge.source);
            continue;
        }
        let label = format!("{} -- {}", edge.source, edge.target);
        let style = EdgeStyle {
            color: edge.color.unwrap_or(edge_style.color),
            width: edge.width.map_or(edge_style.width, |w| {
                clamp_logged(w, MIN_EDGE_WIDTH, MAX_EDGE_WIDTH, "width", &label)
            }),
        };
        if model.add_edge_styled(a, b, style).is_none() {
            debug!("collapsing duplicate edge {label}");
        }
    }
}

fn clamp_logged(value: f64, min: f64, max: f64, what: &str, owner: &str) -> f64 {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != value {
        warn!("{what} {value} of {owner} clamped to {clamped}");
    }
    clamped
}

// =============================================================================
// Shared by the dialects
// =============================================================================

pub(crate) fn node_key(value: &Value) -> Result<String, String> {
    value
        .as_key()
        .ok_or_else(|| format!("unsupported node identifier {}", value.repr()))
}

/// Colors the editor cannot represent are ignored with a warning.
pub(crate) fn color_value(value: &Value, owner: &str) -> Option<Color> {
    let parsed = value.as_str().map(str::parse::<Color>);
    match parsed {
        Some(Ok(color)) => Some(color),
        _ => {
            warn!("ignoring color {} of {owner}", value.repr());
            None
        }
    }
}

pub(crate) fn size_value(value: &Value, owner: &str) -> Option<f64> {
    let size = value.as_f64();
    if size.is_none() {
        warn!("ignoring size {} of {owner}", value.repr());
    }
    size
}

pub(crate) fn check_edge_room(current: usize, extra: usize, max_edges: usize) -> Result<(), String> {
    if extra > max_edges.saturating_sub(current) {
        return Err(format!("graph exceeds the limit of {max_edges} edges"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DraftNode {
    pub key: String,
    pub position: Option<Point>,
    pub color: Option<Color>,
    pub radius: Option<f64>,
}

/// Keyed nodes and edges as a dialect accumulates them.
#[derive(Debug, Clone, Default)]
pub(crate) struct DraftGraph {
    nodes: Vec<DraftNode>,
    index: HashMap<String, usize>,
    edges: Vec<ImportedEdge>,
}

impl DraftGraph {
    /// The node named `key`, created on first use.
    pub fn node(&mut self, key: &str, max_nodes: usize) -> Result<&mut DraftNode, String> {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                if self.nodes.len() >= max_nodes {
                    return Err(format!("graph exceeds the limit of {max_nodes} nodes"));
                }
                self.nodes.push(DraftNode {
                    key: key.to_string(),
                    ..DraftNode::default()
                });
                self.index.insert(key.to_string(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        Ok(&mut self.nodes[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn remove_node(&mut self, key: &str) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.nodes.retain(|n| n.key != key);
        self.edges.retain(|e| e.source != key && e.target != key);
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.key.clone(), i))
            .collect();
        true
    }

    pub fn add_edge(
        &mut self,
        source: String,
        target: String,
        max_edges: usize,
    ) -> Result<&mut ImportedEdge, String> {
        check_edge_room(self.edges.len(), 1, max_edges)?;
        self.edges.push(ImportedEdge::new(source, target));
        let last = self.edges.len() - 1;
        Ok(&mut self.edges[last])
    }

    pub fn remove_edge(&mut self, source: &str, target: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| {
            !((e.source == source && e.target == target) || (e.source == target && e.target == source))
        });
        self.edges.len() != before
    }

    pub fn nodes(&self) -> &[DraftNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ImportedEdge] {
        &self.edges
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
    }

    pub fn node_keys(&self) -> Value {
        Value::List(self.nodes.iter().map(|n| Value::Str(n.key.clone())).collect())
    }

    pub fn edge_pairs(&self) -> Value {
        Value::List(
            self.edges
                .iter()
                .map(|e| Value::Tuple(vec![Value::Str(e.source.clone()), Value::Str(e.target.clone())]))
                .collect(),
        )
    }

    /// Resolves every node's position with `place` and freezes the graph.
    pub fn finish(
        self,
        mut place: impl FnMut(usize, &DraftNode) -> Result<Point, StructuralError>,
    ) -> Result<ImportedGraph, StructuralError> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let position = place(i, node)?;
            nodes.push(ImportedNode {
                key: node.key.clone(),
                position,
                color: node.color,
                radius: node.radius,
            });
        }
        Ok(ImportedGraph {
            nodes,
            edges: self.edges,
        })
    }
}
