//! Structural statistics over the editor graph, treated as an undirected
//! simple graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::algo::{connected_components, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};

use crate::model::{GraphModel, NodeId};

const EIGENVECTOR_MAX_ITER: usize = 100;
const EIGENVECTOR_TOLERANCE: f64 = 1e-6;

/// Only defined for connected, non-empty graphs.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMetrics {
    pub diameter: usize,
    pub radius: usize,
    pub center: Vec<NodeId>,
    pub periphery: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: Option<f64>,
    pub average_degree: Option<f64>,
    pub average_clustering: Option<f64>,
    pub distances: Option<DistanceMetrics>,
    pub degree_centrality: Vec<(NodeId, f64)>,
    pub betweenness_centrality: Vec<(NodeId, f64)>,
    pub closeness_centrality: Vec<(NodeId, f64)>,
    /// All zeros when the power iteration does not converge.
    pub eigenvector_centrality: Vec<(NodeId, f64)>,
    pub degrees: Vec<(NodeId, usize)>,
}

impl GraphMetrics {
    pub fn compute(model: &GraphModel) -> Self {
        let ids: Vec<NodeId> = model.nodes().map(|n| n.id).collect();
        let graph = undirected(model, &ids);
        let adjacency: Vec<Vec<usize>> = graph
            .node_indices()
            .map(|v| graph.neighbors(v).map(|w| w.index()).collect())
            .collect();

        let n = ids.len();
        let tag = |values: Vec<f64>| -> Vec<(NodeId, f64)> {
            ids.iter().copied().zip(values).collect()
        };

        let (average_clustering, distances) = if n == 0 {
            (None, None)
        } else {
            (
                Some(average_clustering(&adjacency)),
                distance_metrics(&graph).map(|(diameter, radius, center, periphery)| {
                    DistanceMetrics {
                        diameter,
                        radius,
                        center: center.into_iter().map(|i| ids[i]).collect(),
                        periphery: periphery.into_iter().map(|i| ids[i]).collect(),
                    }
                }),
            )
        };

        Self {
            node_count: n,
            edge_count: model.edge_count(),
            density: model.density(),
            average_degree: model.average_degree(),
            average_clustering,
            distances,
            degree_centrality: tag(degree_centrality(&adjacency)),
            betweenness_centrality: tag(betweenness_centrality(&adjacency)),
            closeness_centrality: tag(closeness_centrality(&graph)),
            eigenvector_centrality: tag(eigenvector_centrality(&adjacency)),
            degrees: ids.iter().copied().zip(adjacency.iter().map(Vec::len)).collect(),
        }
    }
}

/// Node weights are the model ids, indexed in `ids` order.
fn undirected(model: &GraphModel, ids: &[NodeId]) -> UnGraph<NodeId, ()> {
    let mut graph = UnGraph::with_capacity(ids.len(), model.edge_count());
    let index: HashMap<NodeId, NodeIndex> =
        ids.iter().map(|id| (*id, graph.add_node(*id))).collect();
    for edge in model.edges() {
        if let (Some(a), Some(b)) = (index.get(&edge.source), index.get(&edge.target)) {
            graph.add_edge(*a, *b, ());
        }
    }
    graph
}

/// Hop counts from `source` to every reachable node.
fn hops(graph: &UnGraph<NodeId, ()>, source: usize) -> Vec<usize> {
    dijkstra(graph, NodeIndex::new(source), None, |_| 1usize)
        .into_values()
        .collect()
}

fn average_clustering(adjacency: &[Vec<usize>]) -> f64 {
    let sets: Vec<HashSet<usize>> = adjacency.iter().map(|a| a.iter().copied().collect()).collect();
    let total: f64 = adjacency
        .iter()
        .map(|neighbors| {
            let k = neighbors.len();
            if k < 2 {
                return 0.0;
            }
            let mut triangles = 0usize;
            for (i, u) in neighbors.iter().enumerate() {
                for w in &neighbors[i + 1..] {
                    if sets[*u].contains(w) {
                        triangles += 1;
                    }
                }
            }
            2.0 * triangles as f64 / (k * (k - 1)) as f64
        })
        .sum();
    total / adjacency.len() as f64
}

/// Diameter, radius, center and periphery, or `None` when disconnected.
fn distance_metrics(
    graph: &UnGraph<NodeId, ()>,
) -> Option<(usize, usize, Vec<usize>, Vec<usize>)> {
    if connected_components(graph) != 1 {
        return None;
    }
    let eccentricity: Vec<usize> = graph
        .node_indices()
        .map(|v| hops(graph, v.index()).into_iter().max().unwrap_or(0))
        .collect();
    let diameter = *eccentricity.iter().max()?;
    let radius = *eccentricity.iter().min()?;
    let with = |target: usize| -> Vec<usize> {
        (0..eccentricity.len())
            .filter(|i| eccentricity[*i] == target)
            .collect()
    };
    Some((diameter, radius, with(radius), with(diameter)))
}

fn degree_centrality(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    if n == 1 {
        return vec![1.0];
    }
    adjacency
        .iter()
        .map(|a| a.len() as f64 / (n - 1) as f64)
        .collect()
}

/// Brandes' algorithm, normalised by `1 / ((n-1)(n-2))`.
fn betweenness_centrality(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    let mut centrality = vec![0.0; n];
    for source in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[source] = 1.0;
        dist[source] = Some(0);

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or(0);
            for &w in &adjacency[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value *= scale;
        }
    }
    centrality
}

/// Wasserman and Faust closeness, scaled by the reachable fraction.
fn closeness_centrality(graph: &UnGraph<NodeId, ()>) -> Vec<f64> {
    let n = graph.node_count();
    (0..n)
        .map(|source| {
            let reachable = hops(graph, source);
            let total: usize = reachable.iter().sum();
            let others = reachable.len() - 1;
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let closeness = others as f64 / total as f64;
            closeness * others as f64 / (n - 1) as f64
        })
        .collect()
}

/// Power iteration on `A + I`, normalised to unit length each step.
fn eigenvector_centrality(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    if n == 0 {
        return Vec::new();
    }
    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..EIGENVECTOR_MAX_ITER {
        let last = x.clone();
        for (v, neighbors) in adjacency.iter().enumerate() {
            for &w in neighbors {
                x[w] += last[v];
            }
        }
        let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for value in &mut x {
            *value /= norm;
        }
        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * EIGENVECTOR_TOLERANCE {
            return x;
        }
    }
    vec![0.0; n]
}

fn write_scores(f: &mut fmt::Formatter<'_>, title: &str, scores: &[(NodeId, f64)]) -> fmt::Result {
    writeln!(f, "\n{title}:")?;
    for (id, score) in scores {
        writeln!(f, "{id}: {score:.3}")?;
    }
    Ok(())
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for GraphMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Metrics Report")?;
        writeln!(f, "===================")?;
        writeln!(f)?;
        writeln!(f, "Number of nodes: {}", self.node_count)?;
        writeln!(f, "Number of edges: {}", self.edge_count)?;
        match self.density {
            Some(density) => writeln!(f, "Density: {density:.3}")?,
            None => writeln!(f, "Density: N/A")?,
        }
        match self.average_degree {
            Some(degree) => writeln!(f, "Average degree: {degree:.2}")?,
            None => writeln!(f, "Average degree: N/A")?,
        }
        match self.average_clustering {
            Some(clustering) => writeln!(f, "Average clustering: {clustering:.3}")?,
            None => writeln!(f, "Average clustering: N/A")?,
        }

        match (&self.distances, self.node_count) {
            (Some(d), _) => {
                writeln!(f, "Diameter: {}", d.diameter)?;
                writeln!(f, "Radius: {}", d.radius)?;
                writeln!(f, "Center nodes: {}", join_ids(&d.center))?;
                writeln!(f, "Periphery nodes: {}", join_ids(&d.periphery))?;
            }
            (None, 0) => {
                for label in ["Diameter", "Radius", "Center nodes", "Periphery nodes"] {
                    writeln!(f, "{label}: N/A")?;
                }
            }
            (None, _) => {
                for label in ["Diameter", "Radius", "Center nodes", "Periphery nodes"] {
                    writeln!(f, "{label}: N/A (graph not connected)")?;
                }
            }
        }

        if self.node_count > 0 {
            write_scores(f, "Degree centrality", &self.degree_centrality)?;
            write_scores(f, "Betweenness centrality", &self.betweenness_centrality)?;
            write_scores(f, "Closeness centrality", &self.closeness_centrality)?;
            write_scores(f, "Eigenvector centrality", &self.eigenvector_centrality)?;
        }

        writeln!(f, "\nNode Degrees:")?;
        for (id, degree) in &self.degrees {
            writeln!(f, "{id}: {degree}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;
    use pretty_assertions::assert_eq;

    fn path(n: usize) -> GraphModel {
        let mut model = GraphModel::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| model.add_node(Point::new(i as f64 * 50.0, 0.0)))
            .collect();
        for pair in ids.windows(2) {
            model.add_edge(pair[0], pair[1]);
        }
        model
    }

    fn scores(values: &[(NodeId, f64)]) -> Vec<String> {
        values.iter().map(|(_, v)| format!("{v:.3}")).collect()
    }

    #[test]
    fn path_of_four() {
        let metrics = GraphMetrics::compute(&path(4));
        assert_eq!(metrics.density, Some(0.5));
        assert_eq!(metrics.average_degree, Some(1.5));
        assert_eq!(metrics.average_clustering, Some(0.0));

        let distances = metrics.distances.clone().unwrap();
        assert_eq!(distances.diameter, 3);
        assert_eq!(distances.radius, 2);
        assert_eq!(join_ids(&distances.center), "n1, n2");
        assert_eq!(join_ids(&distances.periphery), "n0, n3");

        assert_eq!(scores(&metrics.degree_centrality), vec!["0.333", "0.667", "0.667", "0.333"]);
        assert_eq!(scores(&metrics.betweenness_centrality), vec!["0.000", "0.667", "0.667", "0.000"]);
        assert_eq!(scores(&metrics.closeness_centrality), vec!["0.500", "0.750", "0.750", "0.500"]);
    }

    #[test]
    fn triangle_is_fully_clustered() {
        let mut model = path(3);
        let ids: Vec<NodeId> = model.nodes().map(|n| n.id).collect();
        model.add_edge(ids[2], ids[0]);
        let metrics = GraphMetrics::compute(&model);
        assert_eq!(metrics.average_clustering, Some(1.0));
        assert_eq!(scores(&metrics.eigenvector_centrality), vec!["0.577"; 3]);
    }

    #[test]
    fn disconnected_graph_has_no_distances() {
        let mut model = path(2);
        model.add_node(Point::new(500.0, 500.0));
        let metrics = GraphMetrics::compute(&model);
        assert_eq!(metrics.distances, None);
        assert!(metrics.to_string().contains("Diameter: N/A (graph not connected)\n"));
    }

    #[test]
    fn star_is_centred_on_its_hub() {
        let mut model = GraphModel::new();
        let hub = model.add_node(Point::new(0.0, 0.0));
        for i in 1..=4 {
            let leaf = model.add_node(Point::new(i as f64 * 50.0, 0.0));
            model.add_edge(leaf, hub);
        }
        let metrics = GraphMetrics::compute(&model);
        let distances = metrics.distances.unwrap();
        assert_eq!((distances.diameter, distances.radius), (2, 1));
        assert_eq!(distances.center, vec![hub]);
        assert_eq!(distances.periphery.len(), 4);
        assert_eq!(metrics.degrees[0], (hub, 4));
        assert_eq!(scores(&metrics.closeness_centrality)[0], "1.000");
    }

    #[test]
    fn two_components_keep_partial_closeness() {
        let mut model = path(2);
        let a = model.add_node(Point::new(500.0, 0.0));
        let b = model.add_node(Point::new(550.0, 0.0));
        model.add_edge(a, b);
        let metrics = GraphMetrics::compute(&model);
        assert_eq!(metrics.distances, None);
        assert_eq!(scores(&metrics.closeness_centrality), vec!["0.333"; 4]);
    }

    #[test]
    fn single_node() {
        let metrics = GraphMetrics::compute(&path(1));
        assert_eq!(metrics.distances.unwrap().diameter, 0);
        assert_eq!(scores(&metrics.degree_centrality), vec!["1.000"]);
        assert_eq!(scores(&metrics.closeness_centrality), vec!["0.000"]);
    }

    #[test]
    fn empty_report() {
        let report = GraphMetrics::compute(&GraphModel::new()).to_string();
        assert_eq!(
            report,
            "Graph Metrics Report\n\
             ===================\n\
             \n\
             Number of nodes: 0\n\
             Number of edges: 0\n\
             Density: N/A\n\
             Average degree: N/A\n\
             Average clustering: N/A\n\
             Diameter: N/A\n\
             Radius: N/A\n\
             Center nodes: N/A\n\
             Periphery nodes: N/A\n\
             \n\
             Node Degrees:\n"
        );
    }

    #[test]
    fn report_lists_degrees() {
        let report = GraphMetrics::compute(&path(4)).to_string();
        assert!(report.starts_with(
            "Graph Metrics Report\n===================\n\nNumber of nodes: 4\nNumber of edges: 3\n\
             Density: 0.500\nAverage degree: 1.50\n"
        ));
        assert!(report.ends_with("\nNode Degrees:\nn0: 1\nn1: 2\nn2: 2\nn3: 1\n"));
    }
}
