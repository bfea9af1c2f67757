//! CLI command implementations

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use codvis_core::{
    NodeId, NodeTree, Simulation, SimulationConfig, Successor, Vec3, assign_finalized_indices,
};
use serde::Serialize;

use crate::scene::{build_tree, load_scene};

/// A laid-out node, in flattened order.
#[derive(Debug, Serialize)]
struct PlacedNode {
    finalized_index: usize,
    index: usize,
    level: usize,
    name: String,
    kind: String,
    parent: Option<String>,
    size: f32,
    position: Vec3,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn layout(
    model: &Path,
    config: Option<&Path>,
    ticks: Option<usize>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = load_config(config)?;
    if let Some(ticks) = ticks {
        config.ticks = ticks;
    }
    let simulation = Simulation::new(config)?;

    let scene = load_scene(model)?;
    let (mut tree, root) = build_tree(&scene, config.layout.max_size * 0.25)?;
    tracing::info!("Loaded {} nodes from {}", tree.len(), model.display());

    let report = simulation.run(&mut tree, root, config.ticks)?;
    tracing::info!(
        "Ran {} ticks; last tick moved {} nodes, max displacement {:.4}",
        config.ticks,
        report.moved,
        report.max_displacement
    );

    assign_finalized_indices(&mut tree, root)?;
    let placed = placed_nodes(&tree, root)?;

    let json = serde_json::to_string_pretty(&placed)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote layout to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

pub fn inspect(model: &Path) -> anyhow::Result<()> {
    let scene = load_scene(model)?;
    let (tree, root) = build_tree(&scene, 0.0)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{:>6} {:>6}  node", "offset", "index")?;
    for offset in 0..tree.index(root).unwrap_or(0) {
        let Some(id) = tree.get_node(root, offset) else {
            continue;
        };
        let Some(node) = tree.node(id) else {
            continue;
        };
        let depth = tree.ancestors(id).len();
        writeln!(
            stdout,
            "{:>6} {:>6}  {}{} ({})",
            offset,
            node.index(),
            "  ".repeat(depth),
            node.name(),
            node.kind()
        )?;
    }
    Ok(())
}

fn placed_nodes(tree: &NodeTree, root: NodeId) -> anyhow::Result<Vec<PlacedNode>> {
    let mut order = tree.successors(root, 0);
    order.push(Successor { id: root, level: 0 });

    order
        .into_iter()
        .map(|successor| {
            let node = tree
                .node(successor.id)
                .with_context(|| format!("node {} vanished from the tree", successor.id))?;
            Ok(PlacedNode {
                finalized_index: node.finalized_index().unwrap_or_default(),
                index: node.index(),
                level: successor.level,
                name: node.name().to_string(),
                kind: node.kind().to_string(),
                parent: tree
                    .parent(successor.id)
                    .and_then(|p| tree.node(p))
                    .map(|p| p.name().to_string()),
                size: node.size(),
                position: node.position(),
            })
        })
        .collect()
}
