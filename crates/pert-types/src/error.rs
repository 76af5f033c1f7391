use thiserror::Error;

#[derive(Error, Debug)]
pub enum PertError {
    #[error("Cannot fit empty sample group: {0}")]
    EmptyGroup(String),

    #[error("Singular matrix: {0}")]
    Singular(String),

    #[error("Row alignment violated for {what}: expected {expected} rows, got {got}")]
    Alignment {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PertResult<T> = Result<T, PertError>;
