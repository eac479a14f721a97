#![forbid(unsafe_code)]

//! Relational family-tree model used by `kindred-layout` and `kindred`.
//!
//! The [`FamilyTree`] store owns the person map of one tree and hands out immutable, versioned
//! [`TreeSnapshot`]s. All writes go through the mutation API in [`mutation`].

pub mod diagnostic;
pub mod error;
pub mod generation;
pub mod group;
pub mod mutation;
pub mod person;
pub mod stats;
pub mod tree;

pub use diagnostic::{Diagnostic, DiagnosticKind, LinkKind};
pub use error::{MutationError, Result};
pub use generation::{GenerationConflict, derive_generations, generation_conflicts};
pub use group::{group_by_generation, group_by_generation_with};
pub use mutation::{NewPerson, PersonPatch, Relation};
pub use person::{Gender, LegacySpouse, Person, SpouseLink};
pub use stats::{TreeStats, stats};
pub use tree::{FamilyTree, PersonMap, TreeSnapshot};
