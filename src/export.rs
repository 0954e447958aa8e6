use std::collections::HashSet;

use crate::dialect::Dialect;
use crate::model::{Edge, GraphModel, Node};

pub fn export(dialect: Dialect, model: &GraphModel) -> String {
    match dialect {
        Dialect::NetworkX => export_networkx(model),
        Dialect::Igraph => export_igraph(model),
        Dialect::PyVis => export_pyvis(model),
        Dialect::GraphTool => export_graph_tool(model),
        Dialect::PyGraphviz => export_pygraphviz(model),
        Dialect::Dgl => export_dgl(model),
        Dialect::Snap => export_snap(model),
    }
}

/// Each undirected pair once, in the order it is first met while walking
/// every node's incident edges.
pub fn unique_edges(model: &GraphModel) -> Vec<&Edge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for node in model.nodes() {
        for id in node.edges() {
            let Some(edge) = model.edge(*id) else {
                continue;
            };
            if seen.insert(edge.canonical_pair()) {
                edges.push(edge);
            }
        }
    }
    edges
}

pub fn export_networkx(model: &GraphModel) -> String {
    let mut code = String::from("import networkx as nx\n\nG = nx.Graph()\n\n");
    for node in model.nodes() {
        code.push_str(&format!("G.add_node({})\n", py_str(&node.id.to_string())));
    }
    for edge in unique_edges(model) {
        code.push_str(&format!("G.add_edge({})\n", endpoints(edge)));
    }

    code.push_str("\n# Optional: If you want to preserve the layout\npos = {\n");
    for node in model.nodes() {
        code.push_str(&format!("    {}: {},\n", py_str(&node.id.to_string()), py_point(node)));
    }
    code.push_str("}\nnx.draw(G, pos=pos, with_labels=True)\n");
    code
}

pub fn export_igraph(model: &GraphModel) -> String {
    let mut code = String::from("import igraph as ig\n\ng = ig.Graph()\n\n");
    let names: Vec<String> = model.nodes().map(|n| py_str(&n.id.to_string())).collect();
    code.push_str(&format!("g.add_vertices({})\n", names.len()));
    code.push_str(&format!("g.vs['name'] = [{}]\n", names.join(", ")));

    let pairs: Vec<String> = unique_edges(model)
        .into_iter()
        .map(|e| format!("({})", endpoints(e)))
        .collect();
    code.push_str(&format!("edges = [{}]\n", pairs.join(", ")));
    code.push_str("g.add_edges(edges)\n\n");

    code.push_str("# Store node positions as a layout\nlayout = [\n");
    for node in model.nodes() {
        code.push_str(&format!("    {},\n", py_point(node)));
    }
    code.push_str("]\n");
    code
}

pub fn export_pyvis(model: &GraphModel) -> String {
    let node_style = model.node_style();
    let edge_style = model.edge_style();
    let mut code = String::from("from pyvis.network import Network\n\nnet = Network()\n\n");
    for node in model.nodes() {
        code.push_str(&format!(
            "net.add_node({}, x={}, y={}",
            py_str(&node.id.to_string()),
            py_float(node.position.x),
            py_float(node.position.y)
        ));
        if node.color != node_style.color {
            code.push_str(&format!(", color={}", py_str(&node.color.to_string())));
        }
        if node.radius != node_style.radius {
            code.push_str(&format!(", size={}", py_float(node.radius)));
        }
        code.push_str(")\n");
    }
    for edge in unique_edges(model) {
        code.push_str(&format!("net.add_edge({}", endpoints(edge)));
        if edge.color != edge_style.color {
            code.push_str(&format!(", color={}", py_str(&edge.color.to_string())));
        }
        if edge.width != edge_style.width {
            code.push_str(&format!(", width={}", py_float(edge.width)));
        }
        code.push_str(")\n");
    }
    code.push_str("\nnet.show('graph.html')\n");
    code
}

pub fn export_graph_tool(model: &GraphModel) -> String {
    let mut code = String::from(
        "from graph_tool.all import *\n\n\
         g = Graph()\n\
         name = g.new_vertex_property('string')\n\
         pos = g.new_vertex_property('vector<double>')\n\n\
         vertices = {}\n",
    );
    for node in model.nodes() {
        let id = py_str(&node.id.to_string());
        code.push_str("v = g.add_vertex()\n");
        code.push_str(&format!("name[v] = {id}\n"));
        code.push_str(&format!(
            "pos[v] = [{}, {}]\n",
            py_float(node.position.x),
            py_float(node.position.y)
        ));
        code.push_str(&format!("vertices[{id}] = v\n"));
    }
    code.push('\n');
    for edge in unique_edges(model) {
        code.push_str(&format!(
            "g.add_edge(vertices[{}], vertices[{}])\n",
            py_str(&edge.source.to_string()),
            py_str(&edge.target.to_string())
        ));
    }
    code.push_str("\ngraph_draw(g, pos=pos, vertex_text=name)\n");
    code
}

pub fn export_pygraphviz(model: &GraphModel) -> String {
    let node_style = model.node_style();
    let edge_style = model.edge_style();
    let mut code = String::from(
        "import pygraphviz as pgv\n\n\
         # Create a new undirected graph\n\
         G = pgv.AGraph(strict=False, directed=False)\n\n\
         # Add nodes with their positions\n",
    );
    for node in model.nodes() {
        let pos = format!(
            "{},{}!",
            py_float(node.position.x),
            py_float(node.position.y)
        );
        code.push_str(&format!(
            "G.add_node({}, pos={}",
            py_str(&node.id.to_string()),
            py_str(&pos)
        ));
        if node.color != node_style.color {
            code.push_str(&format!(
                ", style='filled', fillcolor={}",
                py_str(&node.color.to_string())
            ));
        }
        code.push_str(")\n");
    }

    code.push_str("\n# Add edges\n");
    for edge in unique_edges(model) {
        code.push_str(&format!("G.add_edge({}", endpoints(edge)));
        if edge.color != edge_style.color {
            code.push_str(&format!(", color={}", py_str(&edge.color.to_string())));
        }
        if edge.width != edge_style.width {
            code.push_str(&format!(", penwidth={}", py_float(edge.width)));
        }
        code.push_str(")\n");
    }
    code.push_str("\nG.draw('graph.png', prog='neato', args='-n2')\n");
    code
}

pub fn export_dgl(model: &GraphModel) -> String {
    let mut code = String::from("import dgl\nimport torch\n\n# Create node ID mappings\nnode_mapping = {\n");
    for (i, node) in model.nodes().enumerate() {
        code.push_str(&format!("    {}: {i},\n", py_str(&node.id.to_string())));
    }
    code.push_str("}\n\n");

    let mapped = |id: String| format!("node_mapping[{}]", py_str(&id));
    let edges = unique_edges(model);
    let src: Vec<String> = edges.iter().map(|e| mapped(e.source.to_string())).collect();
    let dst: Vec<String> = edges.iter().map(|e| mapped(e.target.to_string())).collect();

    code.push_str("# Create edge lists\n");
    code.push_str(&format!("src_nodes = torch.tensor([{}])\n", src.join(", ")));
    code.push_str(&format!("dst_nodes = torch.tensor([{}])\n\n", dst.join(", ")));
    code.push_str("# Create DGL graph\ng = dgl.graph((src_nodes, dst_nodes))\n");
    code
}

pub fn export_snap(model: &GraphModel) -> String {
    let mut code = String::from("import snap\n\n# Create an undirected graph\nG = snap.TUNGraph.New()\n\n# Add nodes\n");
    for node in model.nodes() {
        code.push_str(&format!("G.AddNode({})\n", node.id.index()));
    }
    code.push_str("\n# Add edges\n");
    for edge in unique_edges(model) {
        code.push_str(&format!(
            "G.AddEdge({}, {})\n",
            edge.source.index(),
            edge.target.index()
        ));
    }
    code
}

fn endpoints(edge: &Edge) -> String {
    format!(
        "{}, {}",
        py_str(&edge.source.to_string()),
        py_str(&edge.target.to_string())
    )
}

fn py_point(node: &Node) -> String {
    format!(
        "({}, {})",
        py_float(node.position.x),
        py_float(node.position.y)
    )
}

/// Formats a float the way Python's `repr` does: shortest round-trip digits,
/// switching to exponent form below `1e-4` and from `1e16` up.
pub fn py_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-4) {
        let formatted = format!("{value:e}");
        let (mantissa, exponent) = formatted
            .split_once('e')
            .unwrap_or((formatted.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        format!("{mantissa}e{sign}{digits:0>2}")
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn py_str(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
