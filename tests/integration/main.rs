//! Integration tests for Codvis
//!
//! These tests drive the core through a full layout and exercise the CLI
//! binary end to end.

use std::process::Command;

use codvis_core::{
    GraphNode, LayoutParams, ModelMetadata, NodeKind, NodeTree, Simulation, SimulationConfig,
    Vec3, assign_finalized_indices,
};

const MODEL: &str = r#"{
    "name": "app",
    "kind": "namespace",
    "children": [
        {
            "name": "Engine",
            "kind": "class",
            "links": [{ "target": "Widget", "strength": 2.0 }],
            "children": [
                { "name": "start", "kind": "function" },
                { "name": "stop", "kind": "function" }
            ]
        },
        { "name": "Widget", "kind": "class" },
        { "name": "main", "kind": "function" }
    ]
}"#;

fn codvis() -> Command {
    Command::new(env!("CARGO_BIN_EXE_codvis"))
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = codvis().arg("--help").output().expect("Failed to execute codvis");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Force-directed layout of hierarchical code models"));
}

#[test]
fn test_cli_layout_writes_every_node() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("model.json");
    let out = dir.path().join("layout.json");
    std::fs::write(&model, MODEL).unwrap();

    let status = codvis()
        .args(["layout", "--ticks", "15", "--output"])
        .arg(&out)
        .arg(&model)
        .status()
        .expect("Failed to execute codvis");
    assert!(status.success());

    let placed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let nodes = placed.as_array().unwrap();
    assert_eq!(nodes.len(), 6);
    for (offset, node) in nodes.iter().enumerate() {
        assert_eq!(node["finalized_index"], offset);
    }
    assert_eq!(nodes[5]["name"], "app");
    assert_eq!(nodes[5]["index"], 6);
    assert_eq!(nodes[0]["parent"], "Engine");
}

#[test]
fn test_cli_inspect_lists_flattened_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("model.json");
    std::fs::write(&model, MODEL).unwrap();

    let output = codvis().arg("inspect").arg(&model).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows = stdout.lines().skip(1).collect::<Vec<_>>();
    assert_eq!(rows.len(), 6);
    assert!(rows[0].contains("start"));
    assert!(rows[2].contains("Engine"));
    assert!(rows[5].contains("app"));
}

#[test]
fn test_cli_rejects_missing_model() {
    let dir = tempfile::TempDir::new().unwrap();
    let status = codvis()
        .arg("inspect")
        .arg(dir.path().join("absent.json"))
        .status()
        .unwrap();
    assert!(!status.success());
}

/// Test a full import-like build, layout, and finalize pass on the core API
#[test]
fn test_end_to_end_layout() {
    let mut tree = NodeTree::new();
    let root = tree.insert(GraphNode::new(Vec3::ZERO, "lib", 3.0, NodeKind::Namespace));

    let mut classes = Vec::new();
    for (i, name) in ["Parser", "Lexer", "Token", "Span"].iter().enumerate() {
        let angle = i as f32 * std::f32::consts::FRAC_PI_2;
        let position = Vec3::new(angle.cos(), angle.sin(), 0.0) * 2.0;
        let class = tree
            .add_child_node(root, GraphNode::new(position, *name, 1.0, NodeKind::Class))
            .unwrap();
        classes.push(class);
    }
    let mut field = GraphNode::new(Vec3::ZERO, "Token", 0.5, NodeKind::Variable);
    field.set_model_metadata(ModelMetadata::with_type("Span"));
    tree.add_child_node(classes[1], field).unwrap();
    tree.add_child_node(classes[1], GraphNode::new(Vec3::ZERO, "Span", 0.5, NodeKind::Class))
        .unwrap();

    // Parser ↔ Lexer strongly linked, Token and Span unlinked.
    tree.link_nodes(classes[0], classes[1], 4.0).unwrap();
    tree.link_nodes(classes[1], classes[0], 4.0).unwrap();

    let config = SimulationConfig {
        layout: LayoutParams {
            min_distance: 1.0,
            max_distance: 10.0,
            max_size: 30.0,
            ..LayoutParams::default()
        },
        ..SimulationConfig::default()
    };
    let sim = Simulation::new(config).unwrap();
    sim.run(&mut tree, root, 150).unwrap();

    let pos = |i: usize| tree.node(classes[i]).unwrap().position();
    let linked = pos(0).distance(pos(1));
    let unlinked = pos(2).distance(pos(3));
    assert!(linked < unlinked, "linked {linked} vs unlinked {unlinked}");
    for &class in &classes {
        let p = tree.node(class).unwrap().position();
        assert!(p.is_finite());
        assert!(p.length() < 30.0);
    }

    assert_eq!(assign_finalized_indices(&mut tree, root).unwrap(), 7);
    let resolved = tree
        .child_by_name_and_kind(classes[1], "Token", &NodeKind::Class)
        .unwrap();
    assert_eq!(tree.node(resolved).unwrap().name(), "Span");
    assert_eq!(tree.encapsulating_class(resolved), Ok(resolved));
}
