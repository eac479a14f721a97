use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Mutation(#[from] kindred_graph::MutationError),

    #[error(transparent)]
    Layout(#[from] kindred_layout::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid tabular export: {message}")]
    Tabular { message: String },

    #[error("no layout is ready for tree {tree_id}")]
    NoLayout { tree_id: String },

    #[error("session for tree {tree_id} is closed")]
    Closed { tree_id: String },
}
