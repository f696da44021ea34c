use thiserror::Error;

/// Errors raised while building or exploring a procedure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported procedure: {0}")]
    Unsupported(String),
    #[error("The control flow graph has no entry block")]
    ControlFlowGraphEntryNotFound,
    #[error("Graph vertex not found: {0}")]
    GraphVertexNotFound(usize),
    #[error("Graph edge not found: {0} -> {1}")]
    GraphEdgeNotFound(usize, usize),
    #[error("Instruction {1} not found in block {0}")]
    InstructionNotFound(usize, usize),
    #[error("Check {0} failed: {1}")]
    CheckFailure(String, String),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Error {
        Error::Custom(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
