use crate::config::Canvas;
use kindred_graph::{Diagnostic, Person, SpouseLink};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }
}

/// One person placed on the canvas. `x`/`y` are the node center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    pub person: Arc<Person>,
    pub x: f64,
    pub y: f64,
    pub generation: i32,
}

impl WorkflowNode {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Parent,
    Spouse,
    Sibling,
}

impl ConnectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Parent => "parent",
            ConnectionKind::Spouse => "spouse",
            ConnectionKind::Sibling => "sibling",
        }
    }

    /// Parent edges are directional; spouse and sibling edges are not.
    pub fn is_directed(self) -> bool {
        matches!(self, ConnectionKind::Parent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marriage_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divorce_date: Option<String>,
    pub is_current_spouse: bool,
}

impl From<&SpouseLink> for MarriageInfo {
    fn from(link: &SpouseLink) -> Self {
        Self {
            marriage_date: link.marriage_date.clone(),
            divorce_date: link.divorce_date.clone(),
            is_current_spouse: link.is_current_spouse,
        }
    }
}

/// A typed, anchored edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marriage_info: Option<MarriageInfo>,
}

impl Connection {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.kind, &self.from, &self.to)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }
}

/// Deduplication key of an edge: its kind plus the endpoint pair, sorted for undirected kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    pub kind: ConnectionKind,
    pub a: String,
    pub b: String,
}

impl ConnectionKey {
    pub fn new(kind: ConnectionKind, from: &str, to: &str) -> Self {
        let (a, b) = if kind.is_directed() || from <= to {
            (from, to)
        } else {
            (to, from)
        };
        Self {
            kind,
            a: a.to_string(),
            b: b.to_string(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.as_str(), self.a, self.b)
    }
}

/// One layout pass: positioned nodes plus the edges anchored to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<Connection>,
    pub canvas: Canvas,
    /// Data-integrity problems recovered while building this layout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Layout {
    pub fn empty(canvas: Canvas) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            canvas,
            diagnostics: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_ids(&self) -> FxHashSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn connection_keys(&self) -> FxHashSet<ConnectionKey> {
        self.connections.iter().map(Connection::key).collect()
    }

    /// Bounding box over node rectangles of the given size.
    pub fn bounds(&self, node_width: f64, node_height: f64) -> Option<Bounds> {
        let (hw, hh) = (node_width / 2.0, node_height / 2.0);
        Bounds::from_points(
            self.nodes
                .iter()
                .flat_map(|n| [(n.x - hw, n.y - hh), (n.x + hw, n.y + hh)]),
        )
    }

    pub fn stats(&self) -> LayoutStats {
        let mut out = LayoutStats {
            nodes: self.nodes.len(),
            ..Default::default()
        };
        for c in &self.connections {
            match c.kind {
                ConnectionKind::Parent => out.parent += 1,
                ConnectionKind::Spouse => out.spouse += 1,
                ConnectionKind::Sibling => out.sibling += 1,
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutStats {
    pub nodes: usize,
    pub parent: usize,
    pub spouse: usize,
    pub sibling: usize,
}
