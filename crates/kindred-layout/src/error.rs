#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("tree has {count} members; at most {cap} can be laid out at once")]
    TooManyNodes { count: usize, cap: usize },

    #[error("layout has no node with id: {id}")]
    UnknownNode { id: String },

    #[error("cannot move {id} to non-finite position ({x}, {y})")]
    InvalidTarget { id: String, x: f64, y: f64 },

    #[error("invalid layout config: {message}")]
    InvalidConfig { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
