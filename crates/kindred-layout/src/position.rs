use crate::config::{Canvas, GenerationPolicy, LayoutConfig};
use crate::model::WorkflowNode;
use kindred_graph::{PersonMap, derive_generations, group_by_generation_with};
use std::sync::Arc;

/// Stable per-person offset in `[-range/2, range/2]` on each axis.
///
/// Depends on nothing but the id, so repeated layouts and cache round-trips agree.
pub fn jitter(id: &str, range: f64) -> (f64, f64) {
    if !(range.is_finite() && range > 0.0) {
        return (0.0, 0.0);
    }
    let sum: u64 = id.chars().map(|c| u64::from(u32::from(c))).sum();
    let unit_x = (sum % 101) as f64 / 100.0;
    let unit_y = (sum.wrapping_mul(31) % 97) as f64 / 96.0;
    ((unit_x - 0.5) * range, (unit_y - 0.5) * range)
}

/// Places every person on its generation row.
pub(crate) fn assign_positions(persons: &PersonMap, config: &LayoutConfig) -> Vec<WorkflowNode> {
    let canvas = config.canvas();

    let derived = match config.generation_policy {
        GenerationPolicy::Asserted => None,
        GenerationPolicy::Derived => Some(derive_generations(persons)),
    };
    let generation_of = |id: &str, asserted: i32| {
        derived
            .as_ref()
            .and_then(|d| d.get(id).copied())
            .unwrap_or(asserted)
    };

    let rows = group_by_generation_with(persons, |p| generation_of(&p.id, p.generation));
    let row_spacing = row_spacing(rows.len(), canvas, config);
    let available_width = (canvas.width - 2.0 * config.horizontal_margin).max(0.0);

    let mut nodes = Vec::with_capacity(persons.len());
    for (row_index, (generation, members)) in rows.iter().enumerate() {
        let count = members.len();
        let spacing = if count > 1 {
            config
                .preferred_spacing
                .min(available_width / (count - 1) as f64)
        } else {
            0.0
        };
        let row_width = spacing * count.saturating_sub(1) as f64;
        let start_x = (canvas.width - row_width) / 2.0;
        let y = config.top_margin + row_index as f64 * row_spacing;

        for (i, person) in members.iter().enumerate() {
            let (dx, dy) = jitter(&person.id, config.jitter);
            nodes.push(WorkflowNode {
                id: person.id.clone(),
                person: Arc::clone(person),
                x: start_x + i as f64 * spacing + dx,
                y: y + dy,
                generation: *generation,
            });
        }
    }
    nodes
}

fn row_spacing(row_count: usize, canvas: Canvas, config: &LayoutConfig) -> f64 {
    if row_count < 2 {
        return 0.0;
    }
    let available = (canvas.height - config.top_margin - config.bottom_margin).max(0.0);
    config
        .preferred_row_spacing
        .min(available / (row_count - 1) as f64)
}
