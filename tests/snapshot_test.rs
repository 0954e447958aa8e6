use graphpad::dialect::Dialect;
use graphpad::export::export;
use graphpad::model::{GraphModel, Point};
use pretty_assertions::assert_eq;

fn pair() -> GraphModel {
    let mut model = GraphModel::new();
    let a = model.add_node(Point::new(10.0, 20.0));
    let b = model.add_node(Point::new(30.5, -4.0));
    model.add_edge(a, b);
    model
}

#[test]
fn snapshot_networkx() {
    let expected = "\
import networkx as nx

G = nx.Graph()

G.add_node('n0')
G.add_node('n1')
G.add_edge('n0', 'n1')

# Optional: If you want to preserve the layout
pos = {
    'n0': (10.0, 20.0),
    'n1': (30.5, -4.0),
}
nx.draw(G, pos=pos, with_labels=True)
";
    assert_eq!(export(Dialect::NetworkX, &pair()), expected);
}

#[test]
fn snapshot_igraph() {
    let expected = "\
import igraph as ig

g = ig.Graph()

g.add_vertices(2)
g.vs['name'] = ['n0', 'n1']
edges = [('n0', 'n1')]
g.add_edges(edges)

# Store node positions as a layout
layout = [
    (10.0, 20.0),
    (30.5, -4.0),
]
";
    assert_eq!(export(Dialect::Igraph, &pair()), expected);
}

#[test]
fn snapshot_pyvis() {
    let expected = "\
from pyvis.network import Network

net = Network()

net.add_node('n0', x=10.0, y=20.0)
net.add_node('n1', x=30.5, y=-4.0)
net.add_edge('n0', 'n1')

net.show('graph.html')
";
    assert_eq!(export(Dialect::PyVis, &pair()), expected);
}

#[test]
fn snapshot_graph_tool() {
    let expected = "\
from graph_tool.all import *

g = Graph()
name = g.new_vertex_property('string')
pos = g.new_vertex_property('vector<double>')

vertices = {}
v = g.add_vertex()
name[v] = 'n0'
pos[v] = [10.0, 20.0]
vertices['n0'] = v
v = g.add_vertex()
name[v] = 'n1'
pos[v] = [30.5, -4.0]
vertices['n1'] = v

g.add_edge(vertices['n0'], vertices['n1'])

graph_draw(g, pos=pos, vertex_text=name)
";
    assert_eq!(export(Dialect::GraphTool, &pair()), expected);
}

#[test]
fn snapshot_pygraphviz() {
    let expected = "\
import pygraphviz as pgv

# Create a new undirected graph
G = pgv.AGraph(strict=False, directed=False)

# Add nodes with their positions
G.add_node('n0', pos='10.0,20.0!')
G.add_node('n1', pos='30.5,-4.0!')

# Add edges
G.add_edge('n0', 'n1')

G.draw('graph.png', prog='neato', args='-n2')
";
    assert_eq!(export(Dialect::PyGraphviz, &pair()), expected);
}

#[test]
fn snapshot_dgl() {
    let expected = "\
import dgl
import torch

# Create node ID mappings
node_mapping = {
    'n0': 0,
    'n1': 1,
}

# Create edge lists
src_nodes = torch.tensor([node_mapping['n0']])
dst_nodes = torch.tensor([node_mapping['n1']])

# Create DGL graph
g = dgl.graph((src_nodes, dst_nodes))
";
    assert_eq!(export(Dialect::Dgl, &pair()), expected);
}

#[test]
fn snapshot_snap() {
    let expected = "\
import snap

# Create an undirected graph
G = snap.TUNGraph.New()

# Add nodes
G.AddNode(0)
G.AddNode(1)

# Add edges
G.AddEdge(0, 1)
";
    assert_eq!(export(Dialect::Snap, &pair()), expected);
}

#[test]
fn snapshot_metrics_report() {
    let report = graphpad::metrics::GraphMetrics::compute(&pair()).to_string();
    let expected = "\
Graph Metrics Report
===================

Number of nodes: 2
Number of edges: 1
Density: 1.000
Average degree: 1.00
Average clustering: 0.000
Diameter: 1
Radius: 1
Center nodes: n0, n1
Periphery nodes: n0, n1

Degree centrality:
n0: 1.000
n1: 1.000

Betweenness centrality:
n0: 0.000
n1: 0.000

Closeness centrality:
n0: 1.000
n1: 1.000

Eigenvector centrality:
n0: 0.707
n1: 0.707

Node Degrees:
n0: 1
n1: 1
";
    assert_eq!(report, expected);
}
