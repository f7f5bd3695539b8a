use thiserror::Error;

/// Infrastructure failures: storage, encoding and the runtime itself.
///
/// Rule violations inside the game are [`ActionError`](crate::game::ActionError), not this.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around JSON encoding and decoding errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (data directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when a save blob cannot be brought up to the current format.
    #[error("migration error: {0}")]
    Migration(String),

    /// The runtime actor has stopped and no longer accepts commands.
    #[error("game runtime is closed")]
    RuntimeClosed,

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

pub type GameResult<T> = Result<T, GameError>;
