use thiserror::Error;

/// Errors surfaced to the façade. The reflow core itself never returns
/// `CoreError` — it is total and converts impossibilities into `Conflict`s
/// (see [`crate::conflict`]). `CoreError` is raised only by the adapter layer
/// (A2) and by validation ahead of the core (§6.4 of the specification).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("series is locked: {0}")]
    LockedSeries(String),

    #[error("series has logged completions: {0}")]
    CompletionsExist(String),

    #[error("series is a chain parent with linked children: {0}")]
    LinkedChildrenExist(String),

    #[error("instance does not exist: {0}")]
    NonExistentInstance(String),

    #[error("instance is already cancelled: {0}")]
    AlreadyCancelled(String),

    #[error("instance is cancelled: {0}")]
    CancelledInstance(String),

    #[error("cycle detected in chain links: {0}")]
    CycleDetected(String),

    #[error("chain depth exceeds the implementation limit of {limit}: {series}")]
    ChainDepthExceeded { series: String, limit: u32 },

    #[error("duplicate completion: {0}")]
    DuplicateCompletion(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl CoreError {
    /// The stable string identifier from §6.4, for façade consumers that
    /// need a machine-readable code rather than the `Display` message.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Database(_) | CoreError::Migration(_) | CoreError::Io(_) => "INVALID_DATA",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::DuplicateKey(_) => "DUPLICATE_KEY",
            CoreError::ForeignKey(_) => "FOREIGN_KEY",
            CoreError::InvalidData(_) => "INVALID_DATA",
            CoreError::Validation(_) => "VALIDATION",
            CoreError::LockedSeries(_) => "LOCKED_SERIES",
            CoreError::CompletionsExist(_) => "COMPLETIONS_EXIST",
            CoreError::LinkedChildrenExist(_) => "LINKED_CHILDREN_EXIST",
            CoreError::NonExistentInstance(_) => "NON_EXISTENT_INSTANCE",
            CoreError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            CoreError::CancelledInstance(_) => "CANCELLED_INSTANCE",
            CoreError::CycleDetected(_) => "CYCLE_DETECTED",
            CoreError::ChainDepthExceeded { .. } => "CHAIN_DEPTH_EXCEEDED",
            CoreError::DuplicateCompletion(_) => "DUPLICATE_COMPLETION",
            CoreError::ParseError(_) => "PARSE_ERROR",
            CoreError::InvalidPattern(_) => "INVALID_PATTERN",
            CoreError::InvalidRange(_) => "INVALID_RANGE",
            CoreError::InvalidCondition(_) => "INVALID_CONDITION",
            CoreError::InvalidTimezone(_) => "INVALID_DATA",
        }
    }
}
