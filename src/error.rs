use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("revision specification must be a non-negative integer or 'all', got '{0}'")]
    InvalidRevisionSpec(String),
    #[error("unknown timestamp format '{0}', expected 'wiki', 'isostring' or 'unix'")]
    UnknownTimestampFormat(String),
    #[error("linked articles are only supported up to the 2nd neighbour, got depth {0}")]
    UnsupportedDepth(u8),
    #[error("clashing options for return type: titles and collection were both requested")]
    ConflictingReturnModes,
    #[error("length of spec ({actual}) must match length of collection ({expected})")]
    SpecLengthMismatch { expected: usize, actual: usize },
    #[error("no revision data fetched for article '{title}'")]
    NotFetched { title: String },
    #[error("article '{0}' is already in the collection")]
    DuplicateTitle(String),
    #[error("row has {actual} values but the table has {expected} columns")]
    RowArity { expected: usize, actual: usize },
    #[error("cannot concatenate tables with different columns: {left:?} vs {right:?}")]
    SchemaMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}
