//! Unified error type for the marketplace core and its HTTP surface.

use thiserror::Error;

/// Every failure a workflow can report.
///
/// Idempotency hits that are not failures (an award already granted, a confirmation
/// already recorded) are reported through return values, not through this enum.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input shape or range
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Caller is authenticated but lacks rights over the entity
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Reason the caller was rejected
        message: String,
    },

    /// Missing or invalid bearer credential
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Reason authentication failed
        message: String,
    },

    /// Entity is not in a state that allows the operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state mismatch
        message: String,
    },

    /// The rater already rated this trade
    #[error("Trade {trade_id} already rated by {rater_id}")]
    DuplicateRating {
        /// Trade that was rated
        trade_id: i64,
        /// User who attempted the second rating
        rater_id: String,
    },

    /// A concurrent request changed the row first
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the lost race
        message: String,
    },

    /// Seller already has the maximum number of open remote requests for a listing
    #[error("Too many pending payment requests (limit {limit})")]
    TooManyPendingRequests {
        /// Maximum number of simultaneously pending requests
        limit: u64,
    },

    /// XP balance does not cover the cost
    #[error("Insufficient XP: have {current}, need {required}")]
    InsufficientXp {
        /// Balance at the time of the attempt
        current: i64,
        /// Cost of the requested action
        required: i64,
    },

    /// Transaction payment window has lapsed
    #[error("Transaction {transaction_id} has expired")]
    Expired {
        /// Transaction that expired
        transaction_id: i64,
    },

    /// Payment gateway call failed or returned an unusable account
    #[error("Payment gateway error: {message}")]
    Gateway {
        /// Message from the gateway or describing the failure
        message: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Underlying store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Unexpected failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Gateway`].
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

/// Whether a store error is a unique-constraint violation.
///
/// Idempotency guarantees (one rating per rater and trade, one award per reference)
/// rest on unique indexes; callers turn this condition into a domain outcome.
#[must_use]
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}
