use std::collections::{BTreeMap, HashMap};

use log::warn;

use super::{
    ImportOptions, ImportedEdge, ImportedGraph, ImportedNode, check_edge_room, color_value,
    node_key,
};
use crate::error::{ImportError, StructuralError};
use crate::interp::{self, CallArgs, Host, ObjectRef, Value};
use crate::model::Point;
use crate::snippet_ast::Snippet;

type Attrs = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct AGraph {
    nodes: Vec<(String, Attrs)>,
    index: HashMap<String, usize>,
    edges: Vec<(String, String, Attrs)>,
}

impl AGraph {
    fn node_mut(&mut self, key: &str) -> Option<&mut Attrs> {
        let i = *self.index.get(key)?;
        Some(&mut self.nodes[i].1)
    }
}

#[derive(Debug)]
enum PgvObject {
    Graph(AGraph),
    Node { graph: usize, key: String },
    NodeAttrs { graph: usize, key: String },
    /// `node_attr`, `edge_attr` and `graph_attr`, which only style the drawing.
    Defaults,
}

struct PygraphvizHost {
    objects: Vec<PgvObject>,
    max_nodes: usize,
    max_edges: usize,
}

fn attrs_from(args: &CallArgs) -> Attrs {
    args.keywords
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}

impl PygraphvizHost {
    fn alloc(&mut self, object: PgvObject) -> Value {
        self.objects.push(object);
        Value::Object(ObjectRef(self.objects.len() - 1))
    }

    fn graph_mut(&mut self, graph: usize) -> Result<&mut AGraph, String> {
        match self.objects.get_mut(graph) {
            Some(PgvObject::Graph(g)) => Ok(g),
            _ => Err(format!("object #{graph} is not an AGraph")),
        }
    }

    fn add_node(&mut self, graph: usize, key: String, attrs: &Attrs) -> Result<(), String> {
        let max_nodes = self.max_nodes;
        let g = self.graph_mut(graph)?;
        if g.node_mut(&key).is_none() {
            if g.nodes.len() >= max_nodes {
                return Err(format!("graph exceeds the limit of {max_nodes} nodes"));
            }
            g.index.insert(key.clone(), g.nodes.len());
            g.nodes.push((key.clone(), Attrs::new()));
        }
        if let Some(existing) = g.node_mut(&key) {
            existing.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(())
    }

    fn add_edge(&mut self, graph: usize, u: String, v: String, attrs: Attrs) -> Result<(), String> {
        let max_edges = self.max_edges;
        let g = self.graph_mut(graph)?;
        check_edge_room(g.edges.len(), 1, max_edges)?;
        g.edges.push((u, v, attrs));
        Ok(())
    }
}

impl Host for PygraphvizHost {
    fn roots(&self) -> &'static [&'static str] {
        &["pygraphviz"]
    }

    fn prelude(&mut self) -> Vec<(&'static str, Value)> {
        let graph = self.alloc(PgvObject::Graph(AGraph::default()));
        vec![
            ("pgv", Value::Module("pygraphviz".to_string())),
            ("pygraphviz", Value::Module("pygraphviz".to_string())),
            ("G", graph),
        ]
    }

    fn type_name(&self, object: ObjectRef) -> &'static str {
        match self.objects.get(object.0) {
            Some(PgvObject::Graph(_)) => "AGraph",
            Some(PgvObject::Node { .. }) => "Node",
            Some(PgvObject::NodeAttrs { .. }) => "ItemAttribute",
            Some(PgvObject::Defaults) => "Attribute",
            None => "object",
        }
    }

    fn call_function(&mut self, name: &str, args: CallArgs) -> Result<Value, String> {
        match name {
            "AGraph" => {
                if args.keyword("directed") == Some(&Value::Bool(true)) {
                    return Err("directed AGraphs cannot be imported".to_string());
                }
                Ok(self.alloc(PgvObject::Graph(AGraph::default())))
            }
            _ => Err(format!("unsupported pygraphviz function `{name}`")),
        }
    }

    fn call_method(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: CallArgs,
    ) -> Result<Value, String> {
        let graph = object.0;
        if !matches!(self.objects.get(graph), Some(PgvObject::Graph(_))) {
            return Err(format!(
                "'{}' object has no attribute '{method}'",
                self.type_name(object)
            ));
        }
        let attrs = attrs_from(&args);

        match method {
            "add_node" => {
                let key = node_key(args.required(0, "n", method)?)?;
                self.add_node(graph, key, &attrs)?;
            }
            "add_nodes_from" => {
                let nodes = args.required(0, "nbunch", method)?;
                let nodes = nodes
                    .elements()
                    .ok_or_else(|| format!("'{}' object is not iterable", nodes.type_name()))?;
                for node in &nodes {
                    self.add_node(graph, node_key(node)?, &attrs)?;
                }
            }
            "add_edge" => {
                let u = node_key(args.required(0, "u", method)?)?;
                let v = node_key(args.required(1, "v", method)?)?;
                self.add_edge(graph, u, v, attrs)?;
            }
            "add_edges_from" => {
                let edges = args.required(0, "ebunch", method)?;
                let edges = edges
                    .elements()
                    .ok_or_else(|| format!("'{}' object is not iterable", edges.type_name()))?;
                for edge in &edges {
                    let parts = edge.elements().unwrap_or_default();
                    let [u, v, ..] = parts.as_slice() else {
                        return Err(format!("edge {} must name two endpoints", edge.repr()));
                    };
                    let (u, v) = (node_key(u)?, node_key(v)?);
                    self.add_edge(graph, u, v, attrs.clone())?;
                }
            }
            "get_node" => {
                let key = node_key(args.required(0, "n", method)?)?;
                if self.graph_mut(graph)?.node_mut(&key).is_none() {
                    return Err(format!("node {key} not in graph"));
                }
                return Ok(self.alloc(PgvObject::Node { graph, key }));
            }
            "has_node" => {
                let key = node_key(args.required(0, "n", method)?)?;
                return Ok(Value::Bool(self.graph_mut(graph)?.node_mut(&key).is_some()));
            }
            "nodes" => {
                let g = self.graph_mut(graph)?;
                return Ok(Value::List(
                    g.nodes.iter().map(|(k, _)| Value::Str(k.clone())).collect(),
                ));
            }
            "edges" => {
                let g = self.graph_mut(graph)?;
                return Ok(Value::List(
                    g.edges
                        .iter()
                        .map(|(u, v, _)| Value::Tuple(vec![Value::Str(u.clone()), Value::Str(v.clone())]))
                        .collect(),
                ));
            }
            "number_of_nodes" => return Ok(Value::Int(self.graph_mut(graph)?.nodes.len() as i64)),
            "number_of_edges" => return Ok(Value::Int(self.graph_mut(graph)?.edges.len() as i64)),
            "layout" | "draw" | "write" | "close" => {}
            _ => return Err(format!("'AGraph' object has no attribute '{method}'")),
        }
        Ok(Value::None)
    }

    fn attribute(&mut self, object: ObjectRef, attr: &str) -> Result<Value, String> {
        let target = match (self.objects.get(object.0), attr) {
            (Some(PgvObject::Node { graph, key }), "attr") => Some(PgvObject::NodeAttrs {
                graph: *graph,
                key: key.clone(),
            }),
            (Some(PgvObject::Node { key, .. }), "name") => {
                return Ok(Value::Str(key.clone()));
            }
            (Some(PgvObject::Graph(_)), "node_attr" | "edge_attr" | "graph_attr") => {
                Some(PgvObject::Defaults)
            }
            _ => None,
        };
        match target {
            Some(target) => Ok(self.alloc(target)),
            None => Ok(Value::Method(object, attr.to_string())),
        }
    }

    fn get_item(&mut self, object: ObjectRef, key: &Value) -> Result<Value, String> {
        let Some(PgvObject::NodeAttrs { graph, key: node }) = self.objects.get(object.0) else {
            return Err(format!(
                "'{}' object is not subscriptable",
                self.type_name(object)
            ));
        };
        let (graph, node) = (*graph, node.clone());
        let attrs = self
            .graph_mut(graph)?
            .node_mut(&node)
            .ok_or_else(|| format!("node {node} not in graph"))?;
        attrs
            .get(&key.to_string())
            .map(|v| Value::Str(v.clone()))
            .ok_or_else(|| format!("KeyError: {}", key.repr()))
    }

    fn set_item(&mut self, object: ObjectRef, key: Value, value: Value) -> Result<(), String> {
        let (graph, node) = match self.objects.get(object.0) {
            Some(PgvObject::NodeAttrs { graph, key }) => (*graph, key.clone()),
            Some(PgvObject::Defaults) => return Ok(()),
            _ => {
                return Err(format!(
                    "'{}' object does not support item assignment",
                    self.type_name(object)
                ));
            }
        };
        let attrs = self
            .graph_mut(graph)?
            .node_mut(&node)
            .ok_or_else(|| format!("node {node} not in graph"))?;
        attrs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads a DOT `pos` attribute such as `"12.5,-3!"`.
fn parse_pos(text: &str) -> Option<Point> {
    let (x, y) = text.trim().trim_end_matches('!').split_once(',')?;
    Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn penwidth(text: &str, owner: &str) -> Option<f64> {
    let width = text.trim().parse().ok();
    if width.is_none() {
        warn!("ignoring penwidth `{text}` of {owner}");
    }
    width
}

/// The graph bound to `G`; nodes without a `pos` attribute sit at the origin.
pub(super) fn interpret(
    snippet: &Snippet,
    options: &ImportOptions,
) -> Result<ImportedGraph, ImportError> {
    let mut host = PygraphvizHost {
        objects: Vec::new(),
        max_nodes: options.max_nodes,
        max_edges: options.max_items(),
    };
    let scope = interp::run(snippet, &mut host, options.limits())?;

    let graph = match scope.get("G") {
        Some(Value::Object(object)) => match host.objects.get(object.0) {
            Some(PgvObject::Graph(graph)) => Some(graph),
            _ => None,
        },
        _ => None,
    };
    let Some(graph) = graph else {
        return Err(StructuralError::NoGraph("PyGraphviz AGraph bound to `G`").into());
    };

    let mut nodes = Vec::with_capacity(graph.nodes.len());
    for (key, attrs) in &graph.nodes {
        let position = match attrs.get("pos").map(String::as_str) {
            None | Some("") => Point::default(),
            Some(text) => parse_pos(text).ok_or_else(|| StructuralError::InvalidPosition {
                node: key.clone(),
                value: text.to_string(),
            })?,
        };
        let color = attrs
            .get("fillcolor")
            .and_then(|c| color_value(&Value::Str(c.clone()), key));
        nodes.push(ImportedNode {
            key: key.clone(),
            position,
            color,
            radius: None,
        });
    }

    let edges = graph
        .edges
        .iter()
        .map(|(u, v, attrs)| {
            let owner = format!("edge {u} -- {v}");
            ImportedEdge {
                source: u.clone(),
                target: v.clone(),
                color: attrs
                    .get("color")
                    .and_then(|c| color_value(&Value::Str(c.clone()), &owner)),
                width: attrs.get("penwidth").and_then(|w| penwidth(w, &owner)),
            }
        })
        .collect();
    Ok(ImportedGraph { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;
    use crate::snippet_parser::parse_snippet;
    use pretty_assertions::assert_eq;

    fn import(source: &str) -> Result<ImportedGraph, ImportError> {
        let snippet = parse_snippet(source).map_err(ImportError::Execution)?;
        interpret(&snippet, &ImportOptions::default())
    }

    #[test]
    fn parse_pos_strings() {
        assert_eq!(parse_pos("1.5,2!"), Some(Point::new(1.5, 2.0)));
        assert_eq!(parse_pos(" -3, 4 "), Some(Point::new(-3.0, 4.0)));
        assert_eq!(parse_pos("1.5"), None);
        assert_eq!(parse_pos("a,b"), None);
    }

    #[test]
    fn positions_and_styles() {
        let graph = import(
            "import pygraphviz as pgv\n\
             G = pgv.AGraph(strict=False, directed=False)\n\
             G.add_node('a', pos='10.0,20.0!', style='filled', fillcolor='#ff0000')\n\
             G.add_node('b', pos='30.5,-4.0!')\n\
             G.add_edge('a', 'b', color='#0000ff', penwidth=2.5)\n\
             G.draw('graph.png', prog='neato', args='-n2')\n",
        )
        .unwrap();
        assert_eq!(graph.nodes[0].position, Point::new(10.0, 20.0));
        assert_eq!(graph.nodes[0].color, Some(Color::rgb(255, 0, 0)));
        assert_eq!(graph.nodes[1].position, Point::new(30.5, -4.0));
        assert_eq!(graph.edges[0].color, Some(Color::rgb(0, 0, 255)));
        assert_eq!(graph.edges[0].width, Some(2.5));
    }

    #[test]
    fn missing_pos_defaults_to_origin() {
        let graph = import("import pygraphviz as pgv\nG.add_node('a')\n").unwrap();
        assert_eq!(graph.nodes[0].position, Point::new(0.0, 0.0));
    }

    #[test]
    fn pos_through_the_attr_map() {
        let graph = import(
            "import pygraphviz as pgv\nG.add_node('a')\nG.get_node('a').attr['pos'] = '5,6'\n\
             G.node_attr['shape'] = 'circle'\n",
        )
        .unwrap();
        assert_eq!(graph.nodes[0].position, Point::new(5.0, 6.0));
    }

    #[test]
    fn unparsable_pos_is_reported() {
        let err = import("import pygraphviz as pgv\nG.add_node('a', pos='left')\n").unwrap_err();
        assert_eq!(
            err,
            ImportError::Structural(StructuralError::InvalidPosition {
                node: "a".to_string(),
                value: "left".to_string(),
            })
        );
    }

    #[test]
    fn directed_graphs_are_rejected() {
        let err = import("import pygraphviz as pgv\nG = pgv.AGraph(directed=True)\n").unwrap_err();
        assert!(err.to_string().contains("directed"), "{err}");
    }

    #[test]
    fn get_node_requires_the_node() {
        let err = import("import pygraphviz as pgv\nn = G.get_node('x')\n").unwrap_err();
        assert!(err.to_string().contains("node x not in graph"), "{err}");
    }
}
