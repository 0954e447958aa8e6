use std::collections::HashSet;

use graphpad::dialect::Dialect;
use graphpad::export::export;
use graphpad::model::{GraphModel, Point};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    AddNode(f64, f64),
    AddEdge(usize, usize),
    DeleteNode(usize),
    DeleteEdge(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-500.0..500.0f64, -500.0..500.0f64).prop_map(|(x, y)| Op::AddNode(x, y)),
        (0..12usize, 0..12usize).prop_map(|(a, b)| Op::AddEdge(a, b)),
        (0..12usize).prop_map(Op::DeleteNode),
        (0..12usize).prop_map(Op::DeleteEdge),
    ]
}

/// Applies `op`, picking targets by position among the live items.
fn apply(model: &mut GraphModel, op: &Op) {
    let nodes: Vec<_> = model.nodes().map(|n| n.id).collect();
    let edges: Vec<_> = model.edges().map(|e| e.id).collect();
    match *op {
        Op::AddNode(x, y) => {
            model.add_node(Point::new(x, y));
        }
        Op::AddEdge(a, b) => {
            if let (Some(&a), Some(&b)) = (nodes.get(a), nodes.get(b)) {
                model.add_edge(a, b);
            }
        }
        Op::DeleteNode(i) => {
            if let Some(&id) = nodes.get(i) {
                model.delete_node(id);
            }
        }
        Op::DeleteEdge(i) => {
            if let Some(&id) = edges.get(i) {
                model.delete_edge(id);
            }
        }
    }
}

fn check_incidence(model: &GraphModel) -> Result<(), TestCaseError> {
    let mut pairs = HashSet::new();
    for edge in model.edges() {
        prop_assert_ne!(edge.source, edge.target);
        prop_assert!(pairs.insert(edge.canonical_pair()), "duplicate pair {:?}", edge);
        for node in model.nodes() {
            let listed = node.edges().contains(&edge.id);
            let endpoint = node.id == edge.source || node.id == edge.target;
            prop_assert_eq!(listed, endpoint);
        }
    }
    let degree_sum: usize = model.nodes().map(|n| n.degree()).sum();
    prop_assert_eq!(degree_sum, 2 * model.edge_count());
    Ok(())
}

proptest! {
    #[test]
    fn incidence_survives_any_edit_sequence(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut model = GraphModel::new();
        for op in &ops {
            apply(&mut model, op);
            check_incidence(&model)?;
        }
    }

    #[test]
    fn delete_node_removes_exactly_its_degree(ops in prop::collection::vec(arb_op(), 1..40), pick in 0..12usize) {
        let mut model = GraphModel::new();
        for op in &ops {
            apply(&mut model, op);
        }
        let nodes: Vec<_> = model.nodes().map(|n| n.id).collect();
        if let Some(&id) = nodes.get(pick % nodes.len().max(1)) {
            let before = model.edge_count();
            let degree = model.degree(id).unwrap_or(0);
            model.delete_node(id);
            prop_assert_eq!(model.edge_count(), before - degree);
        }
    }

    #[test]
    fn export_is_deterministic(ops in prop::collection::vec(arb_op(), 0..30)) {
        let mut model = GraphModel::new();
        for op in &ops {
            apply(&mut model, op);
        }
        for dialect in Dialect::ALL {
            prop_assert_eq!(export(dialect, &model), export(dialect, &model));
        }
    }
}

#[test]
fn self_loop_never_counts() {
    let mut model = GraphModel::new();
    let a = model.add_node(Point::default());
    assert_eq!(model.add_edge(a, a), None);
    assert_eq!(model.edge_count(), 0);
    assert_eq!(model.degree(a), Some(0));
}

#[test]
fn density_of_a_path() {
    let mut model = GraphModel::new();
    let ids: Vec<_> = (0..4).map(|i| model.add_node(Point::new(i as f64, 0.0))).collect();
    for pair in ids.windows(2) {
        model.add_edge(pair[0], pair[1]);
    }
    assert_eq!(model.density(), Some(0.5));
    assert_eq!(model.average_degree(), Some(1.5));
}

#[test]
fn hit_testing_prefers_nodes() {
    let mut model = GraphModel::new();
    let a = model.add_node(Point::new(0.0, 0.0));
    let b = model.add_node(Point::new(200.0, 0.0));
    let edge = model.add_edge(a, b).unwrap();
    assert_eq!(
        model.item_at(Point::new(5.0, 0.0), 3.0),
        Some(graphpad::model::SceneItem::Node(a))
    );
    assert_eq!(
        model.item_at(Point::new(100.0, 2.0), 3.0),
        Some(graphpad::model::SceneItem::Edge(edge))
    );
    assert_eq!(model.item_at(Point::new(100.0, 50.0), 3.0), None);
}
