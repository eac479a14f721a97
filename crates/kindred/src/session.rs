use crate::cache::{CacheLookup, LayoutCache};
use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::export::TreeExport;
use crate::store::LayoutStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use kindred_graph::{
    FamilyTree, NewPerson, Person, PersonPatch, Relation, TreeSnapshot, TreeStats,
};
use kindred_layout::{Layout, LayoutConfig, RepositionNode, apply_positions, compute_layout};
use std::sync::Arc;

/// What a renderer should show for the tree right now.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutView {
    /// No layout has been produced yet.
    Loading,
    /// The tree has no members.
    Empty,
    Ready(Arc<Layout>),
    /// The tree is above the node cap; the host should ask the user to narrow the view.
    TooManyNodes { count: usize, cap: usize },
    /// The last recompute handed to [`TreeSession::apply_layout`] failed.
    Failed(kindred_layout::Error),
}

impl LayoutView {
    pub fn layout(&self) -> Option<&Arc<Layout>> {
        match self {
            LayoutView::Ready(layout) => Some(layout),
            _ => None,
        }
    }
}

/// A recompute request bound to the tree version it observed.
#[derive(Debug, Clone)]
pub struct LayoutTicket {
    snapshot: TreeSnapshot,
}

impl LayoutTicket {
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    pub fn snapshot(&self) -> &TreeSnapshot {
        &self.snapshot
    }

    /// Runs the layout pass for this ticket's snapshot.
    pub fn compute(&self, config: &LayoutConfig) -> kindred_layout::Result<Layout> {
        compute_layout(&self.snapshot.persons, config)
    }
}

/// One open family tree: the person store, its layout cache and the current view.
///
/// A session is driven from a single thread. I/O happens only inside the `async` methods; the
/// rest is synchronous.
pub struct TreeSession<S: LayoutStore> {
    tree: FamilyTree,
    cache: LayoutCache<S>,
    config: EngineConfig,
    view: LayoutView,
    autosave: Debouncer,
    closed: bool,
}

impl<S: LayoutStore> TreeSession<S> {
    pub fn new(tree: FamilyTree, store: S, config: EngineConfig) -> Self {
        let cache = LayoutCache::new(store, config.cache_expiry(), config.cache_key_prefix.clone());
        Self {
            tree,
            cache,
            autosave: Debouncer::new(config.autosave_delay()),
            config,
            view: LayoutView::Loading,
            closed: false,
        }
    }

    /// Rebuilds a session from an export and seeds the cache with the exported positions.
    pub async fn restore(
        export: TreeExport,
        store: S,
        config: EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let positions = export.positions();
        let tree = export.into_tree();
        let mut session = Self::new(tree, store, config);

        let ticket = session.begin_layout();
        let result = ticket.compute(&session.config.layout).map(|layout| {
            apply_positions(
                &layout,
                positions.iter().map(|(id, p)| (id.as_str(), *p)),
                &session.config.layout,
            )
        });
        let result = fail_unless_capacity(result)?;
        if let Ok(layout) = &result {
            session.write_cache(layout, now).await;
        }
        session.apply_layout(&ticket, result);
        Ok(session)
    }

    pub fn tree(&self) -> &FamilyTree {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &LayoutCache<S> {
        &self.cache
    }

    pub fn view(&self) -> &LayoutView {
        &self.view
    }

    pub fn layout(&self) -> Option<&Arc<Layout>> {
        self.view.layout()
    }

    pub fn stats(&self) -> TreeStats {
        kindred_graph::stats(self.tree.persons())
    }

    pub fn has_pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Captures the current tree version for a recompute.
    pub fn begin_layout(&self) -> LayoutTicket {
        LayoutTicket {
            snapshot: self.tree.snapshot(),
        }
    }

    /// Installs a recompute result. Returns `false`, leaving the view untouched, when the tree
    /// has changed since `ticket` was issued.
    pub fn apply_layout(
        &mut self,
        ticket: &LayoutTicket,
        result: kindred_layout::Result<Layout>,
    ) -> bool {
        if ticket.version() != self.tree.version() {
            tracing::debug!(
                tree_id = self.tree.id(),
                ticket = ticket.version(),
                current = self.tree.version(),
                "discarding stale layout"
            );
            return false;
        }
        self.view = match result {
            Ok(layout) if layout.nodes.is_empty() => LayoutView::Empty,
            Ok(layout) => LayoutView::Ready(Arc::new(layout)),
            Err(kindred_layout::Error::TooManyNodes { count, cap }) => {
                LayoutView::TooManyNodes { count, cap }
            }
            Err(err) => {
                tracing::warn!(tree_id = self.tree.id(), error = %err, "layout failed");
                LayoutView::Failed(err)
            }
        };
        true
    }

    /// Brings the view up to date: reuses the cached layout when it still matches the tree,
    /// otherwise recomputes and writes the result back.
    ///
    /// Exceeding the node cap is reported through the view. Any other layout failure is
    /// returned as [`Error::Layout`] and leaves the view unchanged.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<&LayoutView> {
        self.ensure_open()?;
        let ticket = self.begin_layout();

        if ticket.snapshot().is_empty() {
            self.apply_layout(&ticket, Ok(Layout::empty(self.config.layout.canvas())));
            return Ok(&self.view);
        }
        let cap = self.config.layout.max_nodes;
        if ticket.snapshot().len() > cap {
            let count = ticket.snapshot().len();
            self.apply_layout(&ticket, Err(kindred_layout::Error::TooManyNodes { count, cap }));
            return Ok(&self.view);
        }

        let lookup = self
            .cache
            .read(
                self.tree.id(),
                &ticket.snapshot().persons,
                &self.config.layout,
                now,
            )
            .await;

        let result = match lookup {
            CacheLookup::Hit(layout) => Ok(layout),
            CacheLookup::Miss(reason) => {
                tracing::debug!(tree_id = self.tree.id(), ?reason, "recomputing layout");
                let result = fail_unless_capacity(ticket.compute(&self.config.layout))?;
                if let Ok(layout) = &result {
                    self.write_cache(layout, now).await;
                }
                result
            }
        };
        self.apply_layout(&ticket, result);
        Ok(&self.view)
    }

    pub async fn add_person(
        &mut self,
        data: NewPerson,
        anchor: Option<&str>,
        relation: Relation,
        now: DateTime<Utc>,
    ) -> Result<String> {
        self.ensure_open()?;
        let id = self.tree.add_person(data, anchor, relation)?;
        self.after_mutation(now).await?;
        Ok(id)
    }

    pub async fn delete_person<F>(
        &mut self,
        id: &str,
        can_delete: F,
        now: DateTime<Utc>,
    ) -> Result<Arc<Person>>
    where
        F: FnOnce(&Person) -> bool,
    {
        self.ensure_open()?;
        let removed = self.tree.delete_person(id, can_delete)?;
        self.after_mutation(now).await?;
        Ok(removed)
    }

    pub async fn edit_person(
        &mut self,
        id: &str,
        patch: PersonPatch,
        now: DateTime<Utc>,
    ) -> Result<Arc<Person>> {
        self.ensure_open()?;
        let updated = self.tree.edit_person(id, patch)?;
        self.after_mutation(now).await?;
        Ok(updated)
    }

    /// Applies a drag and schedules a debounced cache write when coordinates changed.
    pub fn reposition(&mut self, cmd: &RepositionNode, now: DateTime<Utc>) -> Result<Arc<Layout>> {
        self.ensure_open()?;
        let Some(current) = self.view.layout() else {
            return Err(Error::NoLayout {
                tree_id: self.tree.id().to_string(),
            });
        };
        let next = Arc::new(kindred_layout::reposition_node(
            current,
            cmd,
            &self.config.layout,
        )?);
        if next.nodes != current.nodes {
            self.autosave.schedule(now);
        }
        self.view = LayoutView::Ready(Arc::clone(&next));
        Ok(next)
    }

    /// Event-loop hook: writes the pending drag once the debounce delay has elapsed.
    /// Returns whether a write was attempted.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.closed || !self.autosave.fire_if_due(now) {
            return false;
        }
        self.persist_view(now).await;
        true
    }

    /// Writes a pending drag immediately.
    pub async fn flush(&mut self, now: DateTime<Utc>) -> bool {
        if self.closed || !self.autosave.is_pending() {
            return false;
        }
        self.autosave.cancel();
        self.persist_view(now).await;
        true
    }

    /// Tears the session down. Pending saves are dropped and further calls are rejected.
    pub fn close(&mut self) {
        self.autosave.cancel();
        self.closed = true;
    }

    pub fn export(&self, now: DateTime<Utc>) -> TreeExport {
        TreeExport::from_tree(&self.tree, self.layout().map(Arc::as_ref), now)
    }

    async fn after_mutation(&mut self, now: DateTime<Utc>) -> Result<()> {
        // A pending drag belongs to the previous person set.
        self.autosave.cancel();
        if let Err(err) = self.cache.invalidate(self.tree.id()).await {
            tracing::warn!(tree_id = self.tree.id(), error = %err, "layout cache invalidation failed");
        }
        self.refresh(now).await?;
        Ok(())
    }

    async fn persist_view(&self, now: DateTime<Utc>) {
        if let Some(layout) = self.view.layout() {
            self.write_cache(layout, now).await;
        }
    }

    async fn write_cache(&self, layout: &Layout, now: DateTime<Utc>) {
        if let Err(err) = self.cache.write(self.tree.id(), layout, now).await {
            tracing::warn!(tree_id = self.tree.id(), error = %err, "layout cache write failed");
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed {
                tree_id: self.tree.id().to_string(),
            });
        }
        Ok(())
    }
}

/// Keeps capacity failures as a view state and lifts every other layout error.
fn fail_unless_capacity(
    result: kindred_layout::Result<Layout>,
) -> Result<kindred_layout::Result<Layout>> {
    match result {
        Err(err @ kindred_layout::Error::TooManyNodes { .. }) => Ok(Err(err)),
        Err(err) => Err(Error::Layout(err)),
        ok => Ok(ok),
    }
}
