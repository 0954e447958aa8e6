use log::debug;

use super::{ImportOptions, ImportedEdge, ImportedGraph, ImportedNode, check_edge_room, node_key};
use crate::error::{ImportError, StructuralError};
use crate::interp::{self, CallArgs, Host, ObjectRef, Value, dict_get};
use crate::model::Point;
use crate::snippet_ast::Snippet;

#[derive(Debug, Default)]
struct IgGraph {
    /// One slot per vertex; `None` until the `name` attribute is set.
    names: Vec<Option<String>>,
    edges: Vec<(Value, Value)>,
}

#[derive(Debug)]
enum IgObject {
    Graph(IgGraph),
    Vertices(usize),
    Layout(Vec<Point>),
}

struct IgraphHost<'o> {
    objects: Vec<IgObject>,
    options: &'o ImportOptions,
}

impl IgraphHost<'_> {
    fn alloc(&mut self, object: IgObject) -> Value {
        self.objects.push(object);
        Value::Object(ObjectRef(self.objects.len() - 1))
    }

    fn graph_mut(&mut self, object: ObjectRef) -> Result<&mut IgGraph, String> {
        match self.objects.get_mut(object.0) {
            Some(IgObject::Graph(graph)) => Ok(graph),
            _ => Err(format!("object #{} is not an igraph Graph", object.0)),
        }
    }

    /// The graph, provided `extra` more vertices fit within the node limit.
    fn graph_with_room(&mut self, object: ObjectRef, extra: usize) -> Result<&mut IgGraph, String> {
        let max_nodes = self.options.max_nodes;
        let graph = self.graph_mut(object)?;
        if extra > max_nodes.saturating_sub(graph.names.len()) {
            return Err(format!("graph exceeds the limit of {max_nodes} nodes"));
        }
        Ok(graph)
    }

    fn add_vertices(&mut self, object: ObjectRef, names: Vec<Option<String>>) -> Result<(), String> {
        self.graph_with_room(object, names.len())?.names.extend(names);
        Ok(())
    }

    fn add_unnamed(&mut self, object: ObjectRef, count: i64) -> Result<(), String> {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let graph = self.graph_with_room(object, count)?;
        let total = graph.names.len() + count;
        graph.names.resize(total, None);
        Ok(())
    }

    fn add_edges(&mut self, object: ObjectRef, edges: Vec<(Value, Value)>) -> Result<(), String> {
        let max_edges = self.options.max_items();
        let graph = self.graph_mut(object)?;
        check_edge_room(graph.edges.len(), edges.len(), max_edges)?;
        graph.edges.extend(edges);
        Ok(())
    }
}

fn edge_list(value: &Value) -> Result<Vec<(Value, Value)>, String> {
    let items = value
        .elements()
        .ok_or_else(|| format!("'{}' object is not iterable", value.type_name()))?;
    items
        .iter()
        .map(|pair| match pair.elements().as_deref() {
            Some([u, v]) => Ok((u.clone(), v.clone())),
            _ => Err(format!("edge {} must name two endpoints", pair.repr())),
        })
        .collect()
}

impl Host for IgraphHost<'_> {
    fn roots(&self) -> &'static [&'static str] {
        &["igraph"]
    }

    fn prelude(&mut self) -> Vec<(&'static str, Value)> {
        vec![
            ("ig", Value::Module("igraph".to_string())),
            ("igraph", Value::Module("igraph".to_string())),
            ("Graph", Value::Module("igraph.Graph".to_string())),
        ]
    }

    fn type_name(&self, object: ObjectRef) -> &'static str {
        match self.objects.get(object.0) {
            Some(IgObject::Graph(_)) => "Graph",
            Some(IgObject::Vertices(_)) => "VertexSeq",
            Some(IgObject::Layout(_)) => "Layout",
            None => "object",
        }
    }

    fn call_function(&mut self, name: &str, args: CallArgs) -> Result<Value, String> {
        if name != "Graph" {
            return Err(format!("unsupported igraph function `{name}`"));
        }
        if args.keyword("directed") == Some(&Value::Bool(true)) {
            return Err("directed igraph graphs cannot be imported".to_string());
        }
        let count = match args.arg(0, "n") {
            None => 0,
            Some(value) => value
                .as_int()
                .filter(|n| *n >= 0)
                .ok_or_else(|| format!("Graph() vertex count must be a non-negative int, not {}", value.repr()))?,
        };
        let edges = match args.arg(1, "edges") {
            Some(value) => edge_list(value)?,
            None => Vec::new(),
        };
        let graph = self.alloc(IgObject::Graph(IgGraph::default()));
        if let Value::Object(object) = graph {
            self.add_unnamed(object, count)?;
            self.add_edges(object, edges)?;
        }
        Ok(graph)
    }

    fn call_method(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: CallArgs,
    ) -> Result<Value, String> {
        match method {
            "add_vertices" => {
                match args.required(0, "n", method)? {
                    Value::Int(n) if *n >= 0 => self.add_unnamed(object, *n)?,
                    value => {
                        let names = value
                            .elements()
                            .ok_or_else(|| format!("add_vertices() expects a count or names, not {}", value.repr()))?
                            .iter()
                            .map(|v| node_key(v).map(Some))
                            .collect::<Result<Vec<_>, String>>()?;
                        self.add_vertices(object, names)?;
                    }
                }
            }
            "add_vertex" => {
                let name = args.arg(0, "name").map(node_key).transpose()?;
                self.add_vertices(object, vec![name])?;
            }
            "add_edges" => {
                let edges = edge_list(args.required(0, "es", method)?)?;
                self.add_edges(object, edges)?;
            }
            "add_edge" => {
                let source = args.required(0, "source", method)?.clone();
                let target = args.required(1, "target", method)?.clone();
                self.add_edges(object, vec![(source, target)])?;
            }
            "vcount" => return Ok(Value::Int(self.graph_mut(object)?.names.len() as i64)),
            "ecount" => return Ok(Value::Int(self.graph_mut(object)?.edges.len() as i64)),
            layout if layout == "layout" || layout.starts_with("layout_") => {
                let count = self.graph_mut(object)?.names.len();
                debug!("placing {layout} result on a circle");
                let points = self.options.auto_layout(count);
                return Ok(self.alloc(IgObject::Layout(points)));
            }
            _ => {
                return Err(format!(
                    "'{}' object has no attribute '{method}'",
                    self.type_name(object)
                ));
            }
        }
        Ok(Value::None)
    }

    fn attribute(&mut self, object: ObjectRef, attr: &str) -> Result<Value, String> {
        let is_graph = matches!(self.objects.get(object.0), Some(IgObject::Graph(_)));
        if is_graph && attr == "vs" {
            return Ok(self.alloc(IgObject::Vertices(object.0)));
        }
        Ok(Value::Method(object, attr.to_string()))
    }

    fn get_item(&mut self, object: ObjectRef, key: &Value) -> Result<Value, String> {
        match self.objects.get(object.0) {
            Some(IgObject::Vertices(graph)) if key.as_str() == Some("name") => {
                let Some(IgObject::Graph(graph)) = self.objects.get(*graph) else {
                    return Err("vertex sequence lost its graph".to_string());
                };
                Ok(Value::List(
                    graph
                        .names
                        .iter()
                        .map(|n| n.clone().map_or(Value::None, Value::Str))
                        .collect(),
                ))
            }
            Some(IgObject::Layout(points)) => {
                let i = key
                    .as_int()
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|i| *i < points.len())
                    .ok_or_else(|| format!("layout index {} out of range", key.repr()))?;
                Ok(Value::Tuple(vec![Value::Float(points[i].x), Value::Float(points[i].y)]))
            }
            _ => Err(format!(
                "'{}' object is not subscriptable",
                self.type_name(object)
            )),
        }
    }

    fn set_item(&mut self, object: ObjectRef, key: Value, value: Value) -> Result<(), String> {
        let Some(IgObject::Vertices(graph)) = self.objects.get(object.0) else {
            return Err(format!(
                "'{}' object does not support item assignment",
                self.type_name(object)
            ));
        };
        let graph = ObjectRef(*graph);
        if key.as_str() != Some("name") {
            debug!("ignoring vertex attribute {}", key.repr());
            return Ok(());
        }
        let names = value
            .elements()
            .ok_or_else(|| format!("vertex names must be a list, not {}", value.type_name()))?;
        let graph = self.graph_mut(graph)?;
        if names.len() != graph.names.len() {
            return Err(format!(
                "attribute list length must match the number of vertices ({} != {})",
                names.len(),
                graph.names.len()
            ));
        }
        graph.names = names
            .iter()
            .map(|v| node_key(v).map(Some))
            .collect::<Result<Vec<_>, String>>()?;
        Ok(())
    }
}

fn resolve_positions(layout: Option<&Value>, host: &IgraphHost<'_>, count: usize) -> Result<Vec<Point>, ImportError> {
    let points = match layout {
        None => {
            debug!("snippet has no `layout`, using the automatic layout");
            host.options.auto_layout(count)
        }
        Some(Value::List(items) | Value::Tuple(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_point().ok_or_else(|| StructuralError::InvalidPosition {
                    node: i.to_string(),
                    value: item.repr(),
                })
            })
            .collect::<Result<Vec<_>, StructuralError>>()?,
        Some(Value::Dict(entries)) => (0..count)
            .map(|i| {
                let entry = dict_get(entries, &Value::Int(i as i64));
                match entry {
                    None => Ok(Point::default()),
                    Some(item) => item.as_point().ok_or_else(|| StructuralError::InvalidPosition {
                        node: i.to_string(),
                        value: item.repr(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, StructuralError>>()?,
        Some(Value::Object(object)) => match host.objects.get(object.0) {
            Some(IgObject::Layout(points)) => points.clone(),
            _ => return Err(layout_type_error()),
        },
        Some(_) => return Err(layout_type_error()),
    };
    if points.len() != count {
        return Err(StructuralError::LayoutMismatch {
            positions: points.len(),
            vertices: count,
        }
        .into());
    }
    Ok(points)
}

fn layout_type_error() -> ImportError {
    ImportError::Execution(
        "the `layout` variable must be an igraph Layout, a list of points or a dict".to_string(),
    )
}

/// The first igraph Graph the snippet binds, placed with its `layout`.
pub(super) fn interpret(
    snippet: &Snippet,
    options: &ImportOptions,
) -> Result<ImportedGraph, ImportError> {
    let mut host = IgraphHost {
        objects: Vec::new(),
        options,
    };
    let scope = interp::run(snippet, &mut host, options.limits())?;

    let graph = scope.locals().find_map(|(_, value)| match value {
        Value::Object(object) => match host.objects.get(object.0) {
            Some(IgObject::Graph(graph)) => Some(graph),
            _ => None,
        },
        _ => None,
    });
    let Some(graph) = graph else {
        return Err(StructuralError::NoGraph("igraph Graph").into());
    };
    if graph.names.is_empty() {
        return Err(StructuralError::NoNodes.into());
    }

    let positions = resolve_positions(scope.local("layout"), &host, graph.names.len())?;
    let keys: Vec<String> = graph
        .names
        .iter()
        .enumerate()
        .map(|(i, name)| name.clone().unwrap_or_else(|| i.to_string()))
        .collect();

    let resolve = |end: &Value| -> Option<String> {
        match end {
            Value::Int(i) => usize::try_from(*i).ok().and_then(|i| keys.get(i).cloned()),
            Value::Str(s) => graph
                .names
                .iter()
                .position(|n| n.as_deref() == Some(s.as_str()))
                .map(|i| keys[i].clone()),
            _ => None,
        }
    };
    let mut edges = Vec::with_capacity(graph.edges.len());
    for (source, target) in &graph.edges {
        match (resolve(source), resolve(target)) {
            (Some(a), Some(b)) => edges.push(ImportedEdge::new(a, b)),
            _ => {
                return Err(StructuralError::UnknownEndpoint {
                    from: source.to_string(),
                    to: target.to_string(),
                }
                .into());
            }
        }
    }

    let nodes = keys
        .iter()
        .zip(positions)
        .map(|(key, position)| ImportedNode {
            key: key.clone(),
            position,
            color: None,
            radius: None,
        })
        .collect();
    Ok(ImportedGraph { nodes, edges })
}
