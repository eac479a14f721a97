use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Where a node's row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationPolicy {
    /// Trust each person's `generation` field.
    #[default]
    Asserted,
    /// Propagate generations from the `generation == 0` persons over relation links.
    Derived,
}

/// Geometry knobs for the layout pass. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Canvas size as a multiple of the viewport.
    pub canvas_scale: f64,
    pub horizontal_margin: f64,
    pub preferred_spacing: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    pub preferred_row_spacing: f64,
    /// Full width of the per-node offset band on each axis.
    pub jitter: f64,
    pub node_width: f64,
    pub node_height: f64,
    /// Minimum center-to-center distance kept by repositioning.
    pub min_separation: f64,
    pub max_nodes: usize,
    pub generation_policy: GenerationPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 400.0,
            viewport_height: 800.0,
            canvas_scale: 3.0,
            horizontal_margin: 100.0,
            preferred_spacing: 220.0,
            top_margin: 120.0,
            bottom_margin: 120.0,
            preferred_row_spacing: 260.0,
            jitter: 30.0,
            node_width: 120.0,
            node_height: 80.0,
            min_separation: 140.0,
            max_nodes: 50,
            generation_policy: GenerationPolicy::Asserted,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("viewportWidth", self.viewport_width),
            ("viewportHeight", self.viewport_height),
            ("canvasScale", self.canvas_scale),
            ("nodeWidth", self.node_width),
            ("nodeHeight", self.node_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be a positive number, got {value}"),
                });
            }
        }

        let non_negative = [
            ("horizontalMargin", self.horizontal_margin),
            ("preferredSpacing", self.preferred_spacing),
            ("topMargin", self.top_margin),
            ("bottomMargin", self.bottom_margin),
            ("preferredRowSpacing", self.preferred_row_spacing),
            ("jitter", self.jitter),
            ("minSeparation", self.min_separation),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }

        if self.max_nodes == 0 {
            return Err(Error::InvalidConfig {
                message: "maxNodes must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.viewport_width * self.canvas_scale,
            height: self.viewport_height * self.canvas_scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}
