//! Errors that can occur while diffing, patching, or talking to the solver.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed caller input: a mapping referencing an unknown post id, an
    /// attempt to insert a root, a merge of differently-named nodes, empty
    /// HTML, an unusable child-path id.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The move-detection protocol found a node whose expected parent is not
    /// among its ancestors; the mapping is pathological.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The external tree-edit-distance solver failed or produced output we
    /// cannot understand.
    #[error("external solver failure: {0}")]
    ExternalFailure(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
