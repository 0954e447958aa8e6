use super::{DraftGraph, ImportOptions, ImportedGraph, color_value, node_key, size_value};
use crate::error::{ImportError, StructuralError};
use crate::interp::{self, CallArgs, Host, ObjectRef, Value};
use crate::model::Point;
use crate::snippet_ast::Snippet;

/// Network methods that only affect rendering in the browser.
const PRESENTATION: [&str; 12] = [
    "show",
    "write_html",
    "save_graph",
    "toggle_physics",
    "toggle_drag_nodes",
    "toggle_stabilization",
    "set_options",
    "show_buttons",
    "repulsion",
    "hrepulsion",
    "barnes_hut",
    "force_atlas_2based",
];

struct PyvisHost {
    networks: Vec<DraftGraph>,
    max_nodes: usize,
    max_edges: usize,
}

/// Element `i` of a per-node keyword list such as `x=[...]` in `add_nodes`.
fn nth(list: Option<&Value>, i: usize) -> Option<Value> {
    list.and_then(Value::elements).and_then(|items| items.get(i).cloned())
}

fn point(x: Option<&Value>, y: Option<&Value>, key: &str) -> Result<Option<Point>, String> {
    match (x, y) {
        (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Some(Point::new(x, y))),
            _ => Err(format!("node {key} has non-numeric coordinates {}, {}", x.repr(), y.repr())),
        },
        _ => Ok(None),
    }
}

impl PyvisHost {
    fn add_node(
        &mut self,
        network: usize,
        id: &Value,
        position: (Option<&Value>, Option<&Value>),
        color: Option<&Value>,
        size: Option<&Value>,
    ) -> Result<(), String> {
        let key = node_key(id)?;
        let point = point(position.0, position.1, &key)?;
        let node = self.networks[network].node(&key, self.max_nodes)?;
        if point.is_some() {
            node.position = point;
        }
        if let Some(color) = color {
            node.color = color_value(color, &key).or(node.color);
        }
        if let Some(size) = size {
            node.radius = size_value(size, &key).or(node.radius);
        }
        Ok(())
    }
}

impl Host for PyvisHost {
    fn roots(&self) -> &'static [&'static str] {
        &["pyvis"]
    }

    fn prelude(&mut self) -> Vec<(&'static str, Value)> {
        vec![
            ("Network", Value::Module("pyvis.network.Network".to_string())),
            ("net", Value::None),
        ]
    }

    fn type_name(&self, _object: ObjectRef) -> &'static str {
        "Network"
    }

    fn call_function(&mut self, name: &str, _args: CallArgs) -> Result<Value, String> {
        match name {
            "Network" => {
                self.networks.push(DraftGraph::default());
                Ok(Value::Object(ObjectRef(self.networks.len() - 1)))
            }
            _ => Err(format!("unsupported pyvis function `{name}`")),
        }
    }

    fn call_method(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: CallArgs,
    ) -> Result<Value, String> {
        let network = object.0;
        if network >= self.networks.len() {
            return Err(format!("unknown object #{network}"));
        }

        match method {
            "add_node" => {
                let id = args.required(0, "n_id", method)?;
                self.add_node(
                    network,
                    id,
                    (args.keyword("x"), args.keyword("y")),
                    args.arg(3, "color"),
                    args.keyword("size"),
                )?;
            }
            "add_nodes" => {
                let ids = args.required(0, "nodes", method)?;
                let ids = ids
                    .elements()
                    .ok_or_else(|| format!("'{}' object is not iterable", ids.type_name()))?;
                for (i, id) in ids.iter().enumerate() {
                    let x = nth(args.keyword("x"), i);
                    let y = nth(args.keyword("y"), i);
                    let color = nth(args.keyword("color"), i);
                    let size = nth(args.keyword("size"), i);
                    self.add_node(network, id, (x.as_ref(), y.as_ref()), color.as_ref(), size.as_ref())?;
                }
            }
            "add_edge" => {
                let source = node_key(args.required(0, "source", method)?)?;
                let target = node_key(args.required(1, "to", method)?)?;
                let owner = format!("edge {source} -- {target}");
                let color = args.keyword("color").and_then(|c| color_value(c, &owner));
                let width = args.keyword("width").and_then(|w| size_value(w, &owner));
                let edge = self.networks[network].add_edge(source, target, self.max_edges)?;
                edge.color = color;
                edge.width = width;
            }
            "add_edges" => {
                let edges = args.required(0, "edges", method)?;
                let edges = edges
                    .elements()
                    .ok_or_else(|| format!("'{}' object is not iterable", edges.type_name()))?;
                for item in &edges {
                    let parts = item.elements().unwrap_or_default();
                    let [source, target, rest @ ..] = parts.as_slice() else {
                        return Err(format!("edge {} must name two endpoints", item.repr()));
                    };
                    let (source, target) = (node_key(source)?, node_key(target)?);
                    let owner = format!("edge {source} -- {target}");
                    let width = rest.first().and_then(|w| size_value(w, &owner));
                    self.networks[network]
                        .add_edge(source, target, self.max_edges)?
                        .width = width;
                }
            }
            "get_nodes" => return Ok(self.networks[network].node_keys()),
            "get_edges" => return Ok(self.networks[network].edge_pairs()),
            "num_nodes" => return Ok(Value::Int(self.networks[network].nodes().len() as i64)),
            "num_edges" => return Ok(Value::Int(self.networks[network].edges().len() as i64)),
            m if PRESENTATION.contains(&m) => {}
            _ => return Err(format!("'Network' object has no attribute '{method}'")),
        }
        Ok(Value::None)
    }
}

/// The first Network the snippet binds; every node needs `x` and `y`.
pub(super) fn interpret(
    snippet: &Snippet,
    options: &ImportOptions,
) -> Result<ImportedGraph, ImportError> {
    let mut host = PyvisHost {
        networks: Vec::new(),
        max_nodes: options.max_nodes,
        max_edges: options.max_items(),
    };
    let scope = interp::run(snippet, &mut host, options.limits())?;

    let network = scope.locals().find_map(|(_, value)| match value {
        Value::Object(object) => Some(object.0),
        _ => None,
    });
    let Some(network) = network else {
        return Err(StructuralError::NoGraph("PyVis Network").into());
    };
    let network = std::mem::take(&mut host.networks[network]);
    if network.nodes().is_empty() {
        return Err(StructuralError::NoNodes.into());
    }

    let graph = network.finish(|_, node| {
        node.position
            .ok_or_else(|| StructuralError::MissingPosition(node.key.clone()))
    })?;
    Ok(graph)
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
    fn nodes_carry_position_color_and_size() {
        let graph = import(
            "from pyvis.network import Network\n\
             net = Network()\n\
             net.add_node('a', x=1.0, y=2.0, color='#ff0000', size=40.0)\n\
             net.add_node('b', x=3, y=4)\n\
             net.add_edge('a', 'b', color='#00ff00', width=3.0)\n\
             net.show('graph.html')\n",
        )
        .unwrap();
        assert_eq!(graph.nodes[0].position, Point::new(1.0, 2.0));
        assert_eq!(graph.nodes[0].color, Some(Color::rgb(255, 0, 0)));
        assert_eq!(graph.nodes[0].radius, Some(40.0));
        assert_eq!(graph.nodes[1].color, None);
        assert_eq!(graph.edges[0].color, Some(Color::rgb(0, 255, 0)));
        assert_eq!(graph.edges[0].width, Some(3.0));
    }

    #[test]
    fn network_under_any_name_is_found() {
        let graph = import(
            "from pyvis.network import Network\nviz = Network(height='500px')\nviz.add_node(1, x=0, y=0)\n",
        )
        .unwrap();
        assert_eq!(graph.nodes[0].key, "1");
    }

    #[test]
    fn add_nodes_takes_per_node_lists() {
        let graph = import(
            "from pyvis.network import Network\nnet = Network()\n\
             net.add_nodes(['a', 'b'], x=[1, 2], y=[3, 4])\nnet.add_edges([('a', 'b', 2)])\n",
        )
        .unwrap();
        assert_eq!(graph.nodes[1].position, Point::new(2.0, 4.0));
        assert_eq!(graph.edges[0].width, Some(2.0));
    }

    #[test]
    fn nodes_need_coordinates() {
        let err = import("from pyvis.network import Network\nnet = Network()\nnet.add_node('a')\n")
            .unwrap_err();
        assert_eq!(
            err,
            ImportError::Structural(StructuralError::MissingPosition("a".to_string()))
        );
    }

    #[test]
    fn named_colors_are_ignored() {
        let graph = import(
            "from pyvis.network import Network\nnet = Network()\nnet.add_node('a', x=0, y=0, color='red')\n",
        )
        .unwrap();
        assert_eq!(graph.nodes[0].color, None);
    }

    #[test]
    fn no_network_and_empty_network() {
        let err = import("from pyvis.network import Network\n").unwrap_err();
        assert_eq!(err, ImportError::Structural(StructuralError::NoGraph("PyVis Network")));
        let err = import("from pyvis.network import Network\nnet = Network()\n").unwrap_err();
        assert_eq!(err, ImportError::Structural(StructuralError::NoNodes));
    }
}
