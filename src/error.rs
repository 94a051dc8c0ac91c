//! Crate-wide error type.

use crate::diagnostic::Diagnostic;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed user input; the diagnostic carries the span.
    #[error("{0}")]
    Parse(Diagnostic),

    #[error("generator {generator} does not fit a braid on {strands} strands")]
    GeneratorOutOfRange { generator: i32, strands: usize },

    #[error("{invariant} is limited to {limit} crossings, braid has {crossings}")]
    TooManyCrossings {
        invariant: &'static str,
        crossings: usize,
        limit: usize,
    },

    /// A polynomial or matrix coefficient left the `i128` range.
    #[error("arithmetic overflow while computing {0}")]
    Arithmetic(&'static str),

    #[error("unknown catalogue entry '{0}'")]
    UnknownKnot(String),

    #[error("unknown strategy '{0}' (expected random, anneal, genetic, mcts or tpe)")]
    UnknownStrategy(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("replay archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<Diagnostic> for Error {
    fn from(d: Diagnostic) -> Self {
        Error::Parse(d)
    }
}

impl Error {
    /// The diagnostic behind a parse error, for span-aware rendering.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Error::Parse(d) => Some(d),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
