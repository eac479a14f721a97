use crate::Result;
use crate::store::LayoutStore;
use chrono::{DateTime, Utc};
use kindred_graph::PersonMap;
use kindred_layout::{Connection, Layout, LayoutConfig, WorkflowNode, build_connections};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Serialized cache blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLayout {
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<Connection>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Expired,
    /// The cached id set differs from the current person set.
    MembershipChanged,
    /// The blob could not be decoded; it has been purged.
    Corrupt,
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Layout),
    Miss(MissReason),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Last known-good layout per tree, validated against the live person set on every read.
#[derive(Debug)]
pub struct LayoutCache<S> {
    store: S,
    expiry: chrono::Duration,
    key_prefix: String,
}

impl<S: LayoutStore> LayoutCache<S> {
    pub fn new(store: S, expiry: chrono::Duration, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            expiry,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self, tree_id: &str) -> String {
        format!("{}{}", self.key_prefix, tree_id)
    }

    /// Looks up the cached layout for `tree_id`.
    ///
    /// A hit is rebound to `persons`, so nodes point at the live records, and its diagnostics
    /// are rederived from them. Storage and decode failures are misses, as is an entry stamped
    /// later than `now`.
    pub async fn read(
        &self,
        tree_id: &str,
        persons: &PersonMap,
        config: &LayoutConfig,
        now: DateTime<Utc>,
    ) -> CacheLookup {
        let key = self.key(tree_id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheLookup::Miss(MissReason::Absent),
            Err(err) => {
                tracing::warn!(tree_id, error = %err, "layout cache read failed");
                return CacheLookup::Miss(MissReason::StoreUnavailable);
            }
        };

        let cached: CachedLayout = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(tree_id, error = %err, "purging corrupt layout cache entry");
                if let Err(err) = self.store.delete(&key).await {
                    tracing::warn!(tree_id, error = %err, "failed to purge corrupt cache entry");
                }
                return CacheLookup::Miss(MissReason::Corrupt);
            }
        };

        if cached.timestamp > now {
            tracing::warn!(tree_id, timestamp = %cached.timestamp, "layout cache entry is from the future");
            return CacheLookup::Miss(MissReason::Expired);
        }
        if now - cached.timestamp > self.expiry {
            tracing::debug!(tree_id, "layout cache entry expired");
            return CacheLookup::Miss(MissReason::Expired);
        }
        if !same_membership(&cached.nodes, persons) {
            tracing::debug!(tree_id, "layout cache membership changed");
            return CacheLookup::Miss(MissReason::MembershipChanged);
        }

        tracing::debug!(tree_id, nodes = cached.nodes.len(), "layout cache hit");
        CacheLookup::Hit(rehydrate(cached, persons, config))
    }

    pub async fn write(&self, tree_id: &str, layout: &Layout, now: DateTime<Utc>) -> Result<()> {
        let blob = CachedLayout {
            nodes: layout.nodes.clone(),
            connections: layout.connections.clone(),
            timestamp: now,
        };
        let text = serde_json::to_string(&blob)?;
        self.store.set(&self.key(tree_id), text).await?;
        Ok(())
    }

    pub async fn invalidate(&self, tree_id: &str) -> Result<()> {
        self.store.delete(&self.key(tree_id)).await?;
        Ok(())
    }
}

fn same_membership(nodes: &[WorkflowNode], persons: &PersonMap) -> bool {
    if nodes.len() != persons.len() {
        return false;
    }
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    nodes
        .iter()
        .all(|n| persons.contains_key(&n.id) && seen.insert(n.id.as_str()))
}

fn rehydrate(cached: CachedLayout, persons: &PersonMap, config: &LayoutConfig) -> Layout {
    let mut nodes = cached.nodes;
    for node in &mut nodes {
        if let Some(live) = persons.get(&node.id) {
            node.person = Arc::clone(live);
        }
    }
    let ids: FxHashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let connections = cached
        .connections
        .into_iter()
        .filter(|c| ids.contains(c.from.as_str()) && ids.contains(c.to.as_str()))
        .collect();
    // Stored anchors are kept; only the dropped-reference report is rebuilt.
    let (_, diagnostics) = build_connections(&nodes, config);
    Layout {
        nodes,
        connections,
        canvas: config.canvas(),
        diagnostics,
    }
}
