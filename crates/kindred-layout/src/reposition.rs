use crate::config::{Canvas, LayoutConfig};
use crate::connect::{End, anchor};
use crate::error::{Error, Result};
use crate::model::{Layout, Point, WorkflowNode};
use serde::{Deserialize, Serialize};

const MAX_RELAXATION_PASSES: usize = 32;
const RING_COUNT: usize = 24;
const RING_SAMPLES: usize = 16;
/// Pushes land this far past the threshold so the floor survives float rounding.
const SEPARATION_SLACK: f64 = 1e-6;

/// A drag command: move node `id` as close to `target` as the layout allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositionNode {
    pub id: String,
    pub target: Point,
}

impl RepositionNode {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            target: Point::new(x, y),
        }
    }
}

/// Applies a drag to `layout` and returns the resulting layout; `layout` itself is not modified.
///
/// Only the moved node's coordinates and the anchors owned by it change.
pub fn reposition_node(layout: &Layout, cmd: &RepositionNode, config: &LayoutConfig) -> Result<Layout> {
    config.validate()?;
    if !(cmd.target.x.is_finite() && cmd.target.y.is_finite()) {
        return Err(Error::InvalidTarget {
            id: cmd.id.clone(),
            x: cmd.target.x,
            y: cmd.target.y,
        });
    }
    if layout.nodes.len() > config.max_nodes {
        return Err(Error::TooManyNodes {
            count: layout.nodes.len(),
            cap: config.max_nodes,
        });
    }
    let index = layout
        .nodes
        .iter()
        .position(|n| n.id == cmd.id)
        .ok_or_else(|| Error::UnknownNode { id: cmd.id.clone() })?;

    let resolved = resolve_position(&layout.nodes, index, cmd.target, layout.canvas, config);

    let mut next = layout.clone();
    {
        let moved = &mut next.nodes[index];
        moved.x = resolved.x;
        moved.y = resolved.y;
    }
    patch_connections(&mut next, index, config);
    Ok(next)
}

fn resolve_position(
    nodes: &[WorkflowNode],
    index: usize,
    target: Point,
    canvas: Canvas,
    config: &LayoutConfig,
) -> Point {
    let clamp = |p: Point| clamp_to_canvas(p, canvas, config);
    let min_separation = config.min_separation;

    let mut p = clamp(target);
    for pass in 0..MAX_RELAXATION_PASSES {
        let mut pushed = false;
        for (j, other) in nodes.iter().enumerate() {
            if j == index {
                continue;
            }
            let center = other.center();
            let d = p.distance(center);
            if d >= min_separation {
                continue;
            }
            let (ux, uy) = if d > f64::EPSILON {
                ((p.x - center.x) / d, (p.y - center.y) / d)
            } else {
                escape_direction(&nodes[index].id)
            };
            let reach = min_separation + SEPARATION_SLACK;
            p = Point::new(center.x + ux * reach, center.y + uy * reach);
            pushed = true;
        }
        p = clamp(p);
        if !pushed {
            tracing::trace!(id = %nodes[index].id, pass, "reposition settled");
            return p;
        }
    }

    if is_clear(nodes, index, p, min_separation) {
        return p;
    }
    match ring_search(nodes, index, target, canvas, config) {
        Some(found) => found,
        None => {
            tracing::warn!(
                id = %nodes[index].id,
                "no free slot near drag target; keeping the closest relaxed position"
            );
            p
        }
    }
}

fn is_clear(nodes: &[WorkflowNode], index: usize, p: Point, min_separation: f64) -> bool {
    nodes
        .iter()
        .enumerate()
        .all(|(j, n)| j == index || p.distance(n.center()) >= min_separation)
}

/// Deterministic scan of concentric rings around `target` for the nearest free, in-bounds spot.
fn ring_search(
    nodes: &[WorkflowNode],
    index: usize,
    target: Point,
    canvas: Canvas,
    config: &LayoutConfig,
) -> Option<Point> {
    let step = (config.min_separation / 2.0).max(1.0);
    for ring in 1..=RING_COUNT {
        let radius = ring as f64 * step;
        for sample in 0..RING_SAMPLES {
            let angle = sample as f64 / RING_SAMPLES as f64 * std::f64::consts::TAU;
            let candidate = Point::new(
                target.x + radius * angle.cos(),
                target.y + radius * angle.sin(),
            );
            let candidate = clamp_to_canvas(candidate, canvas, config);
            if is_clear(nodes, index, candidate, config.min_separation) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Unit vector used when the drag lands exactly on another node's center.
fn escape_direction(id: &str) -> (f64, f64) {
    let sum: u64 = id.chars().map(|c| u64::from(u32::from(c))).sum();
    let angle = (sum % 360) as f64 * std::f64::consts::PI / 180.0;
    (angle.cos(), angle.sin())
}

fn clamp_to_canvas(p: Point, canvas: Canvas, config: &LayoutConfig) -> Point {
    let clamp_axis = |v: f64, half: f64, extent: f64| {
        if extent <= 2.0 * half {
            extent / 2.0
        } else {
            v.clamp(half, extent - half)
        }
    };
    Point::new(
        clamp_axis(p.x, config.node_width / 2.0, canvas.width),
        clamp_axis(p.y, config.node_height / 2.0, canvas.height),
    )
}

fn patch_connections(layout: &mut Layout, index: usize, config: &LayoutConfig) {
    let moved = &layout.nodes[index];
    for c in layout.connections.iter_mut().filter(|c| c.touches(&moved.id)) {
        let (end, other_id) = if c.from == moved.id {
            (End::From, c.to.as_str())
        } else {
            (End::To, c.from.as_str())
        };
        let Some(other) = layout.nodes.iter().find(|n| n.id == other_id) else {
            continue;
        };
        let a = anchor(c.kind, end, moved, other, config);
        match end {
            End::From => {
                c.from_x = a.x;
                c.from_y = a.y;
            }
            End::To => {
                c.to_x = a.x;
                c.to_y = a.y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_layout;
    use kindred_graph::{Person, PersonMap};
    use std::sync::Arc;

    fn persons(list: Vec<Person>) -> PersonMap {
        list.into_iter().map(|p| (p.id.clone(), Arc::new(p))).collect()
    }

    #[test]
    fn drag_onto_neighbour_is_pushed_to_the_floor() {
        let cfg = LayoutConfig::default();
        let layout = compute_layout(
            &persons(vec![Person::new("a", "A", "", 0), Person::new("b", "B", "", 0)]),
            &cfg,
        )
        .unwrap();
        let b = layout.node("b").unwrap().center();
        let original = layout.clone();

        let next = reposition_node(&layout, &RepositionNode::new("a", b.x + 10.0, b.y), &cfg)
            .unwrap();
        let a = next.node("a").unwrap().center();
        assert!(a.distance(b) >= cfg.min_separation);
        // Pushed straight out along the drag line, to the right of b.
        assert!(a.x > b.x);
        assert!((a.y - b.y).abs() < 1e-9);
        assert_eq!(layout, original);
        assert_eq!(next.node("b").unwrap().center(), b);
    }

    #[test]
    fn exact_overlap_escapes_deterministically() {
        let cfg = LayoutConfig::default();
        let layout = compute_layout(
            &persons(vec![Person::new("a", "A", "", 0), Person::new("b", "B", "", 0)]),
            &cfg,
        )
        .unwrap();
        let b = layout.node("b").unwrap().center();
        let cmd = RepositionNode::new("a", b.x, b.y);

        let first = reposition_node(&layout, &cmd, &cfg).unwrap();
        let second = reposition_node(&layout, &cmd, &cfg).unwrap();
        assert_eq!(first, second);
        assert!(first.node("a").unwrap().center().distance(b) >= cfg.min_separation);
    }

    #[test]
    fn target_outside_canvas_is_clamped() {
        let cfg = LayoutConfig::default();
        let layout =
            compute_layout(&persons(vec![Person::new("a", "A", "", 0)]), &cfg).unwrap();
        let next =
            reposition_node(&layout, &RepositionNode::new("a", -500.0, 1.0e9), &cfg).unwrap();
        let a = next.node("a").unwrap();
        assert_eq!(a.x, 60.0);
        assert_eq!(a.y, layout.canvas.height - 40.0);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let cfg = LayoutConfig::default();
        let layout = compute_layout(&persons(vec![]), &cfg).unwrap();
        let err = reposition_node(&layout, &RepositionNode::new("ghost", 0.0, 0.0), &cfg)
            .unwrap_err();
        assert_eq!(err, Error::UnknownNode { id: "ghost".into() });
    }

    #[test]
    fn non_finite_target_is_rejected() {
        let cfg = LayoutConfig::default();
        let layout =
            compute_layout(&persons(vec![Person::new("a", "A", "", 0)]), &cfg).unwrap();
        for (x, y) in [(f64::NAN, 10.0), (10.0, f64::INFINITY)] {
            let err = reposition_node(&layout, &RepositionNode::new("a", x, y), &cfg).unwrap_err();
            assert!(matches!(err, Error::InvalidTarget { ref id, .. } if id == "a"));
        }
    }

    #[test]
    fn only_the_moved_endpoint_anchor_changes() {
        let cfg = LayoutConfig::default();
        let mut a = Person::new("a", "A", "", 0);
        a.children = vec!["b".into()];
        let layout =
            compute_layout(&persons(vec![a, Person::new("b", "B", "", 1)]), &cfg).unwrap();
        let before = layout.connections[0].clone();

        let next =
            reposition_node(&layout, &RepositionNode::new("b", 900.0, 900.0), &cfg).unwrap();
        let after = &next.connections[0];
        assert_eq!((after.from_x, after.from_y), (before.from_x, before.from_y));
        assert_eq!((after.to_x, after.to_y), (900.0, 860.0));
    }
}
