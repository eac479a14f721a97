#![forbid(unsafe_code)]

//! Family-tree layout: generation rows, typed connections and drag repositioning.
//!
//! Everything here is synchronous and pure. The same person map and config always produce the
//! same [`Layout`]; there is no RNG state and no clock.

pub mod config;
mod connect;
pub mod error;
pub mod model;
mod position;
pub mod reposition;

pub use config::{Canvas, GenerationPolicy, LayoutConfig};
pub use connect::build_connections;
pub use error::{Error, Result};
pub use model::{
    Bounds, Connection, ConnectionKey, ConnectionKind, Layout, LayoutStats, MarriageInfo, Point,
    WorkflowNode,
};
pub use position::jitter;
pub use reposition::{RepositionNode, reposition_node};

use kindred_graph::PersonMap;

/// Full recomputation entry point: positions every person, then derives the edge set.
pub fn compute_layout(persons: &PersonMap, config: &LayoutConfig) -> Result<Layout> {
    config.validate()?;
    if persons.len() > config.max_nodes {
        return Err(Error::TooManyNodes {
            count: persons.len(),
            cap: config.max_nodes,
        });
    }

    let nodes = position::assign_positions(persons, config);
    let (connections, diagnostics) = build_connections(&nodes, config);
    Ok(Layout {
        nodes,
        connections,
        canvas: config.canvas(),
        diagnostics,
    })
}

/// Overrides node coordinates (e.g. positions restored from an export) and re-anchors every
/// connection. Ids not present in `layout` are ignored.
pub fn apply_positions<'a, I>(layout: &Layout, positions: I, config: &LayoutConfig) -> Layout
where
    I: IntoIterator<Item = (&'a str, Point)>,
{
    let mut next = layout.clone();
    let mut changed = false;
    for (id, p) in positions {
        if let Some(node) = next.nodes.iter_mut().find(|n| n.id == id) {
            node.x = p.x;
            node.y = p.y;
            changed = true;
        }
    }
    if changed {
        let (connections, _) = build_connections(&next.nodes, config);
        next.connections = connections;
    }
    next
}
