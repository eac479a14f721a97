#![forbid(unsafe_code)]

//! `kindred` lays out family trees for interactive canvases.
//!
//! The crate ties the relational model (`kindred-graph`) and the pure layout pass
//! (`kindred-layout`) to a persistent layout cache:
//!
//! - [`TreeSession`] owns one tree, serves cached layouts when the person set is unchanged and
//!   recomputes otherwise
//! - drags are applied with [`RepositionNode`] and written back after a debounce delay
//! - [`TreeExport`] moves a tree with its positions in and out as JSON or CSV
//!
//! Storage is behind the async [`LayoutStore`] trait. Futures are executor-agnostic.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod session;
pub mod store;

pub use cache::{CacheLookup, CachedLayout, LayoutCache, MissReason};
pub use config::{DEFAULT_CACHE_KEY_PREFIX, EngineConfig};
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use export::{EXPORT_FORMAT_VERSION, ExportRecord, TreeExport};
pub use session::{LayoutTicket, LayoutView, TreeSession};
pub use store::{FileStore, LayoutStore, MemoryStore, StoreError, StoreResult};

pub use kindred_graph::{
    Diagnostic, DiagnosticKind, FamilyTree, Gender, GenerationConflict, MutationError, NewPerson,
    Person, PersonMap, PersonPatch, Relation, SpouseLink, TreeSnapshot, TreeStats,
    derive_generations, generation_conflicts, group_by_generation, stats,
};
pub use kindred_layout::{
    Bounds, Canvas, Connection, ConnectionKind, GenerationPolicy, Layout, LayoutConfig,
    LayoutStats, Point, RepositionNode, WorkflowNode, apply_positions, compute_layout,
    reposition_node,
};
