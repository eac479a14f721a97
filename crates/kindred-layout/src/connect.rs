use crate::config::LayoutConfig;
use crate::model::{Connection, ConnectionKey, ConnectionKind, MarriageInfo, Point, WorkflowNode};
use kindred_graph::{Diagnostic, DiagnosticKind, LinkKind, SpouseLink};
use rustc_hash::FxHashMap;

/// Which end of an edge an anchor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum End {
    From,
    To,
}

/// Anchor point of `node` for an edge of `kind`, given the node at the other end.
///
/// - parent edges leave the parent's bottom-center and enter the child's top-center
/// - spouse edges use the facing sides of the two nodes
/// - sibling edges hang from the top-center of both nodes
pub(crate) fn anchor(
    kind: ConnectionKind,
    end: End,
    node: &WorkflowNode,
    other: &WorkflowNode,
    config: &LayoutConfig,
) -> Point {
    let (hw, hh) = (config.node_width / 2.0, config.node_height / 2.0);
    match (kind, end) {
        (ConnectionKind::Parent, End::From) => Point::new(node.x, node.y + hh),
        (ConnectionKind::Parent, End::To) | (ConnectionKind::Sibling, _) => {
            Point::new(node.x, node.y - hh)
        }
        (ConnectionKind::Spouse, end) => {
            // On a tie the `from` node takes the left seat.
            let on_left = node.x < other.x || (node.x == other.x && end == End::From);
            if on_left {
                Point::new(node.x + hw, node.y)
            } else {
                Point::new(node.x - hw, node.y)
            }
        }
    }
}

pub(crate) fn connect(
    kind: ConnectionKind,
    from: &WorkflowNode,
    to: &WorkflowNode,
    marriage_info: Option<MarriageInfo>,
    config: &LayoutConfig,
) -> Connection {
    let a = anchor(kind, End::From, from, to, config);
    let b = anchor(kind, End::To, to, from, config);
    Connection {
        from: from.id.clone(),
        to: to.id.clone(),
        from_x: a.x,
        from_y: a.y,
        to_x: b.x,
        to_y: b.y,
        kind,
        marriage_info,
    }
}

struct Builder<'a> {
    nodes: FxHashMap<&'a str, &'a WorkflowNode>,
    config: &'a LayoutConfig,
    /// Index into `connections` for every key emitted so far.
    seen: FxHashMap<ConnectionKey, usize>,
    connections: Vec<Connection>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Builder<'a> {
    fn resolve(
        &mut self,
        declared_by: &str,
        other: &str,
        link: LinkKind,
    ) -> Option<(&'a WorkflowNode, &'a WorkflowNode)> {
        if declared_by == other {
            self.report(DiagnosticKind::SelfReference, declared_by, other, link);
            return None;
        }
        let found = self
            .nodes
            .get(declared_by)
            .copied()
            .zip(self.nodes.get(other).copied());
        if found.is_none() {
            self.report(DiagnosticKind::DanglingReference, declared_by, other, link);
        }
        found
    }

    fn report(&mut self, kind: DiagnosticKind, person: &str, other: &str, link: LinkKind) {
        let d = Diagnostic::new(kind, person, other, link);
        tracing::warn!(person = %person, other = %other, link = %link, "dropping connection: {d}");
        self.diagnostics.push(d);
    }

    fn push(
        &mut self,
        kind: ConnectionKind,
        from: &WorkflowNode,
        to: &WorkflowNode,
        marriage_info: Option<MarriageInfo>,
    ) {
        let key = ConnectionKey::new(kind, &from.id, &to.id);
        if let Some(&at) = self.seen.get(&key) {
            // The later declaration only fills gaps left by the first one.
            if let Some(later) = marriage_info {
                let existing = &mut self.connections[at].marriage_info;
                if let Some(info) = existing.as_mut() {
                    fill_missing(info, later);
                } else {
                    *existing = Some(later);
                }
            }
            return;
        }
        self.seen.insert(key, self.connections.len());
        let c = connect(kind, from, to, marriage_info, self.config);
        self.connections.push(c);
    }

    fn parent_edges(&mut self, order: &[&'a WorkflowNode]) {
        for node in order {
            for child in &node.person.children {
                if let Some((parent, child)) = self.resolve(&node.id, child, LinkKind::Child) {
                    self.push(ConnectionKind::Parent, parent, child, None);
                }
            }
        }
        for node in order {
            for parent in &node.person.parents {
                if let Some((child, parent)) = self.resolve(&node.id, parent, LinkKind::Parent) {
                    self.push(ConnectionKind::Parent, parent, child, None);
                }
            }
        }
    }

    fn spouse_edges(&mut self, order: &[&'a WorkflowNode]) {
        for node in order {
            for link in node.person.spouse_links() {
                if let Some((a, b)) = self.resolve(&node.id, &link.id, LinkKind::Spouse) {
                    self.push(ConnectionKind::Spouse, a, b, marriage_info(&link));
                }
            }
        }
    }

    fn sibling_edges(&mut self, order: &[&'a WorkflowNode]) {
        for node in order {
            for sibling in &node.person.siblings {
                let Some((a, b)) = self.resolve(&node.id, sibling, LinkKind::Sibling) else {
                    continue;
                };
                if a.generation != b.generation {
                    self.report(
                        DiagnosticKind::SiblingGenerationMismatch,
                        &a.id,
                        &b.id,
                        LinkKind::Sibling,
                    );
                    continue;
                }
                self.push(ConnectionKind::Sibling, a, b, None);
            }
        }
    }
}

fn marriage_info(link: &SpouseLink) -> Option<MarriageInfo> {
    let carries_info =
        link.marriage_date.is_some() || link.divorce_date.is_some() || link.is_current_spouse;
    carries_info.then(|| MarriageInfo::from(link))
}

fn fill_missing(info: &mut MarriageInfo, later: MarriageInfo) {
    if info.marriage_date.is_none() {
        info.marriage_date = later.marriage_date;
    }
    if info.divorce_date.is_none() {
        info.divorce_date = later.divorce_date;
    }
    info.is_current_spouse |= later.is_current_spouse;
}

/// Derives the deduplicated edge set for already-positioned nodes.
///
/// Edges are built parent/child first, then spouses, then siblings. References that cannot be
/// honoured are skipped and returned as diagnostics.
pub fn build_connections(
    nodes: &[WorkflowNode],
    config: &LayoutConfig,
) -> (Vec<Connection>, Vec<Diagnostic>) {
    let mut index: FxHashMap<&str, &WorkflowNode> = FxHashMap::default();
    for n in nodes {
        index.entry(n.id.as_str()).or_insert(n);
    }
    let order: Vec<&WorkflowNode> = nodes.iter().collect();

    let mut b = Builder {
        nodes: index,
        config,
        seen: FxHashMap::default(),
        connections: Vec::new(),
        diagnostics: Vec::new(),
    };
    b.parent_edges(&order);
    b.spouse_edges(&order);
    b.sibling_edges(&order);
    (b.connections, b.diagnostics)
}
