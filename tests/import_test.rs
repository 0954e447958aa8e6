use graphpad::dialect::Dialect;
use graphpad::error::{ImportError, StructuralError};
use graphpad::export::export;
use graphpad::import::{ImportOptions, import_as, import_snippet, interpret};
use graphpad::model::{Color, GraphModel, Point};
use pretty_assertions::assert_eq;

fn square() -> GraphModel {
    let mut model = GraphModel::new();
    let ids: Vec<_> = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]
        .into_iter()
        .map(|(x, y)| model.add_node(Point::new(x, y)))
        .collect();
    for i in 0..4 {
        model.add_edge(ids[i], ids[(i + 1) % 4]);
    }
    model
}

fn reimport(dialect: Dialect, source: &str) -> GraphModel {
    let mut model = GraphModel::new();
    import_as(dialect, source, &mut model, &ImportOptions::default()).unwrap();
    model
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn every_importable_dialect_round_trips() {
    let original = square();
    for dialect in Dialect::IMPORTABLE {
        let code = export(dialect, &original);
        let restored = reimport(dialect, &code);
        assert_eq!(restored.node_count(), 4, "{dialect}");
        assert_eq!(restored.edge_count(), 4, "{dialect}");
        let positions: Vec<Point> = restored.nodes().map(|n| n.position).collect();
        let expected: Vec<Point> = original.nodes().map(|n| n.position).collect();
        assert_eq!(positions, expected, "{dialect}");
        assert_eq!(export(dialect, &restored), code, "{dialect} export is stable");
    }
}

#[test]
fn detected_dialect_matches_exporter() {
    let original = square();
    for dialect in Dialect::IMPORTABLE {
        let mut model = GraphModel::new();
        let detected =
            import_snippet(&export(dialect, &original), &mut model, &ImportOptions::default())
                .unwrap();
        assert_eq!(detected, dialect);
    }
}

#[test]
fn pyvis_round_trips_styles() {
    let mut original = square();
    let first = original.nodes().next().unwrap().id;
    original.set_node_color(first, Color::rgb(255, 0, 0)).unwrap();
    original.set_node_radius(first, 45.0).unwrap();
    original.set_all_edge_widths(4.0).unwrap();

    let restored = reimport(Dialect::PyVis, &export(Dialect::PyVis, &original));
    let node = restored.nodes().next().unwrap();
    assert_eq!(node.color, Color::rgb(255, 0, 0));
    assert_eq!(node.radius, 45.0);
    assert!(restored.edges().all(|e| e.width == 4.0));
}

#[test]
fn pygraphviz_round_trips_colors() {
    let mut original = square();
    original.set_all_node_colors(Color::rgb(0, 0, 255)).unwrap();
    original.set_all_edge_colors(Color::rgb(0, 128, 0)).unwrap();

    let restored = reimport(Dialect::PyGraphviz, &export(Dialect::PyGraphviz, &original));
    assert!(restored.nodes().all(|n| n.color == Color::rgb(0, 0, 255)));
    assert!(restored.edges().all(|e| e.color == Color::rgb(0, 128, 0)));
}

// =============================================================================
// Atomic replacement
// =============================================================================

#[test]
fn failed_import_leaves_model_untouched() {
    let mut model = square();
    let revision = model.revision();
    let err = import_snippet(
        "import networkx as nx\nG.add_node('a')\nG.add_edge('a', 'z')\n",
        &mut model,
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ImportError::Structural(StructuralError::UnknownEndpoint {
            from: "a".to_string(),
            to: "z".to_string(),
        })
    );
    assert_eq!(model.node_count(), 4);
    assert_eq!(model.revision(), revision);
}

#[test]
fn successful_import_replaces_everything() {
    let mut model = square();
    import_snippet(
        "import networkx as nx\nG.add_node('x', pos=(1, 1))\n",
        &mut model,
        &ImportOptions::default(),
    )
    .unwrap();
    assert_eq!(model.node_count(), 1);
    assert_eq!(model.edge_count(), 0);
    assert_eq!(model.nodes().next().unwrap().id.to_string(), "n0");
}

#[test]
fn self_loops_are_dropped_and_duplicates_collapse() {
    let model = reimport(
        Dialect::NetworkX,
        "import networkx as nx\nG.add_nodes_from(['a', 'b'])\n\
         G.add_edge('a', 'a')\nG.add_edge('a', 'b')\nG.add_edge('b', 'a')\n",
    );
    assert_eq!(model.edge_count(), 1);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn unknown_library() {
    let mut model = GraphModel::new();
    let err = import_snippet("x = 1\n", &mut model, &ImportOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "no supported graph library found in code. Supported libraries: \
         networkx, igraph, pyvis, graph-tool, pygraphviz"
    );
}

#[test]
fn export_only_dialects() {
    for dialect in [Dialect::Dgl, Dialect::Snap] {
        let code = export(dialect, &square());
        let err = interpret(dialect, &code, &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ImportError::UnavailableDialect { .. }), "{err}");
    }
}

#[test]
fn disabled_dialect() {
    let options = ImportOptions {
        enabled: vec![Dialect::NetworkX],
        ..ImportOptions::default()
    };
    let err = interpret(Dialect::PyVis, "from pyvis.network import Network\n", &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "PyVis import is not available: it is disabled in the import configuration"
    );
}

#[test]
fn snippets_are_never_executed() {
    let err = interpret(
        Dialect::NetworkX,
        "import networkx as nx\nimport os\nfor i in range(3):\n    os.remove('x')\n",
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("line 3"), "{err}");
}

#[test]
fn foreign_calls_are_ignored() {
    let graph = interpret(
        Dialect::NetworkX,
        "import networkx as nx\nimport matplotlib.pyplot as plt\n\
         G.add_node('a')\nnx.draw(G)\nplt.show()\n",
        &ImportOptions::default(),
    )
    .unwrap();
    assert_eq!(graph.nodes.len(), 1);
}

#[test]
fn node_limit_is_enforced() {
    let options = ImportOptions {
        max_nodes: 3,
        ..ImportOptions::default()
    };
    let err = interpret(
        Dialect::NetworkX,
        "import networkx as nx\nG.add_nodes_from(range(10))\n",
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::Execution(_)), "{err}");
}

#[test]
fn igraph_layout_mismatch() {
    let err = interpret(
        Dialect::Igraph,
        "import igraph as ig\ng = ig.Graph()\ng.add_vertices(3)\nlayout = [(0, 0), (1, 1)]\n",
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ImportError::Structural(StructuralError::LayoutMismatch {
            positions: 2,
            vertices: 3,
        })
    );
}

#[test]
fn pygraphviz_invalid_position() {
    let err = interpret(
        Dialect::PyGraphviz,
        "import pygraphviz as pgv\nG = pgv.AGraph()\nG.add_node('a', pos='left,up')\n",
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert!(
        matches!(err, ImportError::Structural(StructuralError::InvalidPosition { .. })),
        "{err}"
    );
}

// =============================================================================
// Hostile snippets
// =============================================================================

#[test]
fn huge_vertex_counts_fail_without_allocating() {
    for source in [
        "import igraph as ig\ng = ig.Graph()\ng.add_vertices(9223372036854775807)\n",
        "import igraph as ig\ng = ig.Graph(n=9223372036854775807)\n",
        "import graph_tool.all as gt\ng.add_vertex(9223372036854775807)\n",
    ] {
        let dialect = if source.contains("igraph") {
            Dialect::Igraph
        } else {
            Dialect::GraphTool
        };
        let err = interpret(dialect, source, &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ImportError::Execution(_)), "{err}");
        assert!(err.to_string().contains("exceeds the limit of 10000 nodes"), "{err}");
    }
}

#[test]
fn self_doubling_lists_are_cut_off() {
    let source = format!(
        "import networkx as nx\nxs = [1]\n{}G.add_nodes_from(xs)\n",
        "xs.extend(xs)\n".repeat(22)
    );
    let err = interpret(Dialect::NetworkX, &source, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::Execution(_)), "{err}");
    assert!(err.to_string().contains("exceeds the limit of 1000000 items"), "{err}");
}

#[test]
fn deeply_nested_brackets_are_rejected() {
    let source = format!("import networkx as nx\nx = {}\n", "[".repeat(10_000));
    let err = interpret(Dialect::NetworkX, &source, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::Execution(_)), "{err}");
    assert!(err.to_string().contains("nests more than 64 levels"), "{err}");
}

#[test]
fn duplicate_node_keys_are_rejected() {
    let err = interpret(
        Dialect::Igraph,
        "import igraph as ig\ng = ig.Graph()\ng.add_vertices(['a', 'a'])\n",
        &ImportOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ImportError::Structural(StructuralError::DuplicateNode("a".to_string()))
    );
}
