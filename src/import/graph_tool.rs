use std::collections::HashMap;

use super::{ImportOptions, ImportedEdge, ImportedGraph, ImportedNode, check_edge_room};
use crate::error::{ImportError, StructuralError};
use crate::interp::{self, CallArgs, Host, ObjectRef, Value};
use crate::snippet_ast::Snippet;

#[derive(Debug, Default)]
struct GtGraph {
    vertices: usize,
    edges: Vec<(usize, usize)>,
}

#[derive(Debug)]
enum GtObject {
    Graph(GtGraph),
    Vertex { graph: usize, index: usize },
    Property { graph: usize, values: HashMap<usize, Value> },
}

struct GraphToolHost {
    objects: Vec<GtObject>,
    max_nodes: usize,
    max_edges: usize,
}

impl GraphToolHost {
    fn alloc(&mut self, object: GtObject) -> Value {
        self.objects.push(object);
        Value::Object(ObjectRef(self.objects.len() - 1))
    }

    fn graph_mut(&mut self, graph: usize) -> Result<&mut GtGraph, String> {
        match self.objects.get_mut(graph) {
            Some(GtObject::Graph(g)) => Ok(g),
            _ => Err(format!("object #{graph} is not a graph-tool Graph")),
        }
    }

    /// Index of a vertex handle or plain integer within `graph`.
    fn vertex_index(&self, graph: usize, value: &Value) -> Result<usize, String> {
        let index = match value {
            Value::Object(object) => match self.objects.get(object.0) {
                Some(GtObject::Vertex { graph: owner, index }) if *owner == graph => Some(*index),
                _ => None,
            },
            Value::Int(i) => usize::try_from(*i).ok(),
            _ => None,
        };
        let count = match self.objects.get(graph) {
            Some(GtObject::Graph(g)) => g.vertices,
            _ => 0,
        };
        index
            .filter(|i| *i < count)
            .ok_or_else(|| format!("invalid vertex {}", value.repr()))
    }

    fn property(&self, value: Option<&Value>) -> Option<&HashMap<usize, Value>> {
        match value {
            Some(Value::Object(object)) => match self.objects.get(object.0) {
                Some(GtObject::Property { values, .. }) => Some(values),
                _ => None,
            },
            _ => None,
        }
    }

    fn add_vertices(&mut self, graph: usize, count: usize) -> Result<Vec<Value>, String> {
        let max_nodes = self.max_nodes;
        let g = self.graph_mut(graph)?;
        if count > max_nodes.saturating_sub(g.vertices) {
            return Err(format!("graph exceeds the limit of {max_nodes} nodes"));
        }
        let first = g.vertices;
        g.vertices += count;
        Ok((first..first + count)
            .map(|index| self.alloc(GtObject::Vertex { graph, index }))
            .collect())
    }
}

impl Host for GraphToolHost {
    fn roots(&self) -> &'static [&'static str] {
        &["graph_tool"]
    }

    fn prelude(&mut self) -> Vec<(&'static str, Value)> {
        let g = self.alloc(GtObject::Graph(GtGraph::default()));
        let name = self.alloc(GtObject::Property {
            graph: 0,
            values: HashMap::new(),
        });
        let pos = self.alloc(GtObject::Property {
            graph: 0,
            values: HashMap::new(),
        });
        vec![
            ("graph_tool", Value::Module("graph_tool.all".to_string())),
            ("gt", Value::Module("graph_tool.all".to_string())),
            ("Graph", Value::Module("graph_tool.all.Graph".to_string())),
            ("g", g),
            ("name", name),
            ("pos", pos),
            ("vertices", Value::Dict(Vec::new())),
        ]
    }

    fn type_name(&self, object: ObjectRef) -> &'static str {
        match self.objects.get(object.0) {
            Some(GtObject::Graph(_)) => "Graph",
            Some(GtObject::Vertex { .. }) => "Vertex",
            Some(GtObject::Property { .. }) => "VertexPropertyMap",
            None => "object",
        }
    }

    fn call_function(&mut self, name: &str, _args: CallArgs) -> Result<Value, String> {
        match name {
            "Graph" => Ok(self.alloc(GtObject::Graph(GtGraph::default()))),
            "graph_draw" | "interactive_window" => Ok(Value::None),
            _ => Err(format!("unsupported graph-tool function `{name}`")),
        }
    }

    fn call_method(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: CallArgs,
    ) -> Result<Value, String> {
        let graph = object.0;
        if !matches!(self.objects.get(graph), Some(GtObject::Graph(_))) {
            return Err(format!(
                "'{}' object has no attribute '{method}'",
                self.type_name(object)
            ));
        }

        match method {
            "new_vertex_property" | "new_vp" => Ok(self.alloc(GtObject::Property {
                graph,
                values: HashMap::new(),
            })),
            "add_vertex" => {
                let count = match args.arg(0, "n") {
                    None => 1,
                    Some(n) => n
                        .as_int()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| format!("add_vertex() count must be an int, not {}", n.repr()))?,
                };
                let mut added = self.add_vertices(graph, count)?;
                if count == 1 {
                    Ok(added.remove(0))
                } else {
                    Ok(Value::List(added))
                }
            }
            "add_edge" => {
                let source = self.vertex_index(graph, args.required(0, "source", method)?)?;
                let target = self.vertex_index(graph, args.required(1, "target", method)?)?;
                let max_edges = self.max_edges;
                let g = self.graph_mut(graph)?;
                check_edge_room(g.edges.len(), 1, max_edges)?;
                g.edges.push((source, target));
                Ok(Value::None)
            }
            "vertex" => {
                let index = self.vertex_index(graph, args.required(0, "i", method)?)?;
                Ok(self.alloc(GtObject::Vertex { graph, index }))
            }
            "num_vertices" => Ok(Value::Int(self.graph_mut(graph)?.vertices as i64)),
            "num_edges" => Ok(Value::Int(self.graph_mut(graph)?.edges.len() as i64)),
            _ => Err(format!("'Graph' object has no attribute '{method}'")),
        }
    }

    fn get_item(&mut self, object: ObjectRef, key: &Value) -> Result<Value, String> {
        let Some(GtObject::Property { graph, values }) = self.objects.get(object.0) else {
            return Err(format!(
                "'{}' object is not subscriptable",
                self.type_name(object)
            ));
        };
        let index = self.vertex_index(*graph, key)?;
        Ok(values.get(&index).cloned().unwrap_or(Value::None))
    }

    fn set_item(&mut self, object: ObjectRef, key: Value, value: Value) -> Result<(), String> {
        let Some(GtObject::Property { graph, .. }) = self.objects.get(object.0) else {
            return Err(format!(
                "'{}' object does not support item assignment",
                self.type_name(object)
            ));
        };
        let index = self.vertex_index(*graph, &key)?;
        if let Some(GtObject::Property { values, .. }) = self.objects.get_mut(object.0) {
            values.insert(index, value);
        }
        Ok(())
    }
}

/// The graph bound to `g`, named by `name` and placed by `pos`.
pub(super) fn interpret(
    snippet: &Snippet,
    options: &ImportOptions,
) -> Result<ImportedGraph, ImportError> {
    let mut host = GraphToolHost {
        objects: Vec::new(),
        max_nodes: options.max_nodes,
        max_edges: options.max_items(),
    };
    let scope = interp::run(snippet, &mut host, options.limits())?;

    let graph = match scope.get("g") {
        Some(Value::Object(object)) => match host.objects.get(object.0) {
            Some(GtObject::Graph(graph)) => Some(graph),
            _ => None,
        },
        _ => None,
    };
    let Some(graph) = graph else {
        return Err(StructuralError::NoGraph("graph-tool Graph bound to `g`").into());
    };
    if graph.vertices == 0 {
        return Err(StructuralError::NoNodes.into());
    }
    let Some(pos) = host.property(scope.get("pos")) else {
        return Err(ImportError::Execution(
            "`pos` must be a vertex property map of positions".to_string(),
        ));
    };
    let names = host.property(scope.get("name"));

    let keys: Vec<String> = (0..graph.vertices)
        .map(|i| {
            names
                .and_then(|names| names.get(&i))
                .and_then(Value::as_key)
                .unwrap_or_else(|| i.to_string())
        })
        .collect();

    let mut nodes = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let position = match pos.get(&i) {
            None | Some(Value::None) => {
                return Err(StructuralError::MissingPosition(key.clone()).into());
            }
            Some(value) => value.as_point().ok_or_else(|| StructuralError::InvalidPosition {
                node: key.clone(),
                value: value.repr(),
            })?,
        };
        nodes.push(ImportedNode {
            key: key.clone(),
            position,
            color: None,
            radius: None,
        });
    }

    let edges = graph
        .edges
        .iter()
        .map(|&(a, b)| ImportedEdge::new(keys[a].clone(), keys[b].clone()))
        .collect();
    Ok(ImportedGraph { nodes, edges })
}
