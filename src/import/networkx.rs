use std::collections::HashMap;

use log::debug;

use super::{DraftGraph, ImportOptions, ImportedGraph, node_key};
use crate::error::{ImportError, StructuralError};
use crate::interp::{self, CallArgs, Host, ObjectRef, Value};
use crate::snippet_ast::Snippet;

const LAYOUTS: [&str; 5] = [
    "spring_layout",
    "circular_layout",
    "kamada_kawai_layout",
    "shell_layout",
    "random_layout",
];

struct NetworkxHost<'o> {
    graphs: Vec<DraftGraph>,
    options: &'o ImportOptions,
}

impl NetworkxHost<'_> {
    fn new_graph(&mut self) -> Value {
        self.graphs.push(DraftGraph::default());
        Value::Object(ObjectRef(self.graphs.len() - 1))
    }

    fn graph_arg(&self, args: &CallArgs, function: &str) -> Result<usize, String> {
        match args.required(0, "G", function)? {
            Value::Object(object) if object.0 < self.graphs.len() => Ok(object.0),
            other => Err(format!(
                "{function}() expects a networkx Graph, not {}",
                other.repr()
            )),
        }
    }
}

impl Host for NetworkxHost<'_> {
    fn roots(&self) -> &'static [&'static str] {
        &["networkx"]
    }

    fn prelude(&mut self) -> Vec<(&'static str, Value)> {
        let graph = self.new_graph();
        vec![
            ("nx", Value::Module("networkx".to_string())),
            ("networkx", Value::Module("networkx".to_string())),
            ("G", graph),
        ]
    }

    fn type_name(&self, _object: ObjectRef) -> &'static str {
        "Graph"
    }

    fn call_function(&mut self, name: &str, args: CallArgs) -> Result<Value, String> {
        match name {
            "Graph" => Ok(self.new_graph()),
            "DiGraph" | "MultiGraph" | "MultiDiGraph" => Err(format!(
                "networkx.{name} cannot be imported, only undirected simple graphs can"
            )),
            "draw" | "draw_networkx" | "draw_networkx_nodes" | "draw_networkx_edges"
            | "draw_networkx_labels" => Ok(Value::None),
            layout if LAYOUTS.contains(&layout) => {
                let graph = &self.graphs[self.graph_arg(&args, layout)?];
                debug!("placing {layout} result on a circle");
                let points = self.options.auto_layout(graph.nodes().len());
                let entries = graph
                    .nodes()
                    .iter()
                    .zip(points)
                    .map(|(node, p)| {
                        (
                            Value::Str(node.key.clone()),
                            Value::Tuple(vec![Value::Float(p.x), Value::Float(p.y)]),
                        )
                    })
                    .collect();
                Ok(Value::Dict(entries))
            }
            _ => Err(format!("unsupported networkx function `{name}`")),
        }
    }

    fn call_method(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: CallArgs,
    ) -> Result<Value, String> {
        let max_nodes = self.options.max_nodes;
        let max_edges = self.options.max_items();
        let Some(graph) = self.graphs.get_mut(object.0) else {
            return Err(format!("unknown object #{}", object.0));
        };

        match method {
            "add_node" => {
                let key = node_key(args.required(0, "node_for_adding", method)?)?;
                let node = graph.node(&key, max_nodes)?;
                if let Some(pos) = args.keyword("pos") {
                    let point = pos
                        .as_point()
                        .ok_or_else(|| format!("invalid pos {} for node {key}", pos.repr()))?;
                    node.position = Some(point);
                }
            }
            "add_nodes_from" => {
                for value in iterable(args.required(0, "nodes_for_adding", method)?)? {
                    graph.node(&node_key(&value)?, max_nodes)?;
                }
            }
            "add_edge" => {
                let u = node_key(args.required(0, "u_of_edge", method)?)?;
                let v = node_key(args.required(1, "v_of_edge", method)?)?;
                graph.add_edge(u, v, max_edges)?;
            }
            "add_edges_from" => {
                for pair in iterable(args.required(0, "ebunch_to_add", method)?)? {
                    let (u, v) = endpoints(&pair)?;
                    graph.add_edge(u, v, max_edges)?;
                }
            }
            "remove_node" => {
                let key = node_key(args.required(0, "n", method)?)?;
                if !graph.remove_node(&key) {
                    return Err(format!("the node {key} is not in the graph"));
                }
            }
            "remove_edge" => {
                let u = node_key(args.required(0, "u", method)?)?;
                let v = node_key(args.required(1, "v", method)?)?;
                if !graph.remove_edge(&u, &v) {
                    return Err(format!("the edge {u}-{v} is not in the graph"));
                }
            }
            "has_node" => {
                let key = node_key(args.required(0, "n", method)?)?;
                return Ok(Value::Bool(graph.contains(&key)));
            }
            "nodes" => return Ok(graph.node_keys()),
            "edges" => return Ok(graph.edge_pairs()),
            "number_of_nodes" => return Ok(Value::Int(graph.nodes().len() as i64)),
            "number_of_edges" => return Ok(Value::Int(graph.edges().len() as i64)),
            "clear" => graph.clear(),
            _ => return Err(format!("'Graph' object has no attribute '{method}'")),
        }
        Ok(Value::None)
    }
}

fn iterable(value: &Value) -> Result<Vec<Value>, String> {
    value
        .elements()
        .ok_or_else(|| format!("'{}' object is not iterable", value.type_name()))
}

fn endpoints(pair: &Value) -> Result<(String, String), String> {
    match pair.elements().as_deref() {
        Some([u, v, ..]) => Ok((node_key(u)?, node_key(v)?)),
        _ => Err(format!("edge {} must name two endpoints", pair.repr())),
    }
}

/// The graph bound to `G`, placed with the `pos` dict when the snippet has one.
pub(super) fn interpret(
    snippet: &Snippet,
    options: &ImportOptions,
) -> Result<ImportedGraph, ImportError> {
    let mut host = NetworkxHost {
        graphs: Vec::new(),
        options,
    };
    let scope = interp::run(snippet, &mut host, options.limits())?;

    let Some(&Value::Object(object)) = scope.get("G") else {
        return Err(StructuralError::NoGraph("networkx Graph bound to `G`").into());
    };
    let graph = std::mem::take(&mut host.graphs[object.0]);

    let positions: Option<HashMap<String, Value>> = match scope.local("pos") {
        None => None,
        Some(Value::Dict(entries)) => Some(
            entries
                .iter()
                .filter_map(|(k, v)| Some((k.as_key()?, v.clone())))
                .collect(),
        ),
        Some(other) => {
            return Err(ImportError::Execution(format!(
                "`pos` must be a dict of node positions, not {}",
                other.type_name()
            )));
        }
    };
    if positions.is_none() {
        debug!("snippet has no `pos`, using the automatic layout");
    }

    let auto = options.auto_layout(graph.nodes().len());
    let graph = graph.finish(|i, node| match &positions {
        Some(pos) => match pos.get(&node.key) {
            Some(value) => value.as_point().ok_or_else(|| StructuralError::InvalidPosition {
                node: node.key.clone(),
                value: value.repr(),
            }),
            None => node
                .position
                .ok_or_else(|| StructuralError::MissingPosition(node.key.clone())),
        },
        None => Ok(node.position.unwrap_or(auto[i])),
    })?;
    Ok(graph)
}
