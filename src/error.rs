use thiserror::Error;

/// Failure taxonomy for engine operations.
///
/// Every variant maps to a stable kind string via [`EngineError::kind`] so an
/// API layer can translate outcomes without matching on display text. Storage
/// failures are deliberately opaque: the underlying error is logged where it
/// occurs and never rendered to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No authenticated actor on the request.
    #[error("no authenticated actor")]
    Unauthorized,

    /// Actor lacks the admin/editor role required to manage polls.
    #[error("actor may not manage polls in this organisation")]
    PermissionDenied,

    /// Actor does not belong to the poll's organisation.
    #[error("actor is not a member of the poll's organisation")]
    NotMember,

    /// Actor's membership is not active.
    #[error("actor's membership is not active")]
    NotActive,

    /// Actor's role ranks below the poll's visibility requirement.
    #[error("actor's role is below the poll's visibility level")]
    RoleTooLow,

    /// No poll with the given identifier.
    #[error("poll not found")]
    PollNotFound,

    /// Poll has been closed.
    #[error("poll is not active")]
    PollNotActive,

    /// Poll's end time has passed.
    #[error("poll voting window has ended")]
    PollExpired,

    /// Option does not belong to the poll.
    #[error("option does not belong to this poll")]
    InvalidOption,

    /// The identity key already has a vote on this poll.
    #[error("a vote has already been cast for this identity")]
    AlreadyVoted,

    /// Close requested on an already-closed poll.
    #[error("poll is already closed")]
    PollAlreadyClosed,

    /// Malformed creation input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Unexpected storage-layer failure, surfaced opaquely.
    #[error("internal storage error")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    /// Stable machine-readable kind, suitable for UI translation keys.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Unauthorized => "unauthorized",
            EngineError::PermissionDenied => "permission_denied",
            EngineError::NotMember => "not_member",
            EngineError::NotActive => "not_active",
            EngineError::RoleTooLow => "role_too_low",
            EngineError::PollNotFound => "poll_not_found",
            EngineError::PollNotActive => "poll_not_active",
            EngineError::PollExpired => "poll_expired",
            EngineError::InvalidOption => "invalid_option",
            EngineError::AlreadyVoted => "already_voted",
            EngineError::PollAlreadyClosed => "poll_already_closed",
            EngineError::Validation(_) => "validation_error",
            EngineError::Storage(_) => "storage_error",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
