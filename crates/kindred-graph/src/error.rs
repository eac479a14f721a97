pub type Result<T> = std::result::Result<T, MutationError>;

/// A rejected tree mutation. The store is left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("relation `{relation}` requires an anchor person")]
    MissingAnchor { relation: &'static str },

    #[error("unknown person: {id}")]
    UnknownPerson { id: String },

    #[error("person id already exists: {id}")]
    DuplicateId { id: String },

    #[error("not permitted to delete person: {id}")]
    PermissionDenied { id: String },
}
