//! Error handling module for the clan registry.
//!
//! Every registry operation fails with a typed [`ClanError`]. The command layer
//! turns it into a user-facing message and the HTTP layer into a status code and
//! response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const INVALID_NAME: &str = "INVALID_NAME";
    pub const DUPLICATE_CLAN: &str = "DUPLICATE_CLAN";
    pub const UNKNOWN_CLAN: &str = "UNKNOWN_CLAN";
    pub const UNKNOWN_MEMBER: &str = "UNKNOWN_MEMBER";
    pub const INVALID_RANK: &str = "INVALID_RANK";
    pub const INSUFFICIENT_POINTS: &str = "INSUFFICIENT_POINTS";
    pub const INVALID_AMOUNT: &str = "INVALID_AMOUNT";
    pub const PERSISTENCE_FAILURE: &str = "PERSISTENCE_FAILURE";
    pub const EXTERNAL_FAILURE: &str = "EXTERNAL_COLLABORATOR_FAILURE";
}

/// Clan registry error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClanError {
    /// Malformed or missing arguments
    InvalidInput(String),
    /// Clan name is empty or normalizes to an empty id
    InvalidName(String),
    /// A clan or room already owns the derived id
    DuplicateClan(String),
    /// No clan with this id
    UnknownClan(String),
    /// User is not a member of the clan
    UnknownMember { clan: String, user: String },
    /// Rank is out of range or the change would break the single-leader rule
    InvalidRank(String),
    /// Actor lacks the required capability
    Unauthorized(String),
    /// Deduction would drive the balance negative
    InsufficientPoints {
        clan: String,
        available: i64,
        requested: i64,
    },
    /// Points amount is not a positive integer
    InvalidAmount(String),
    /// Store I/O fault; the operation did not durably commit
    Persistence(String),
    /// Channel creation or teardown failed
    ExternalCollaborator(String),
}

impl ClanError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClanError::InvalidInput(_)
            | ClanError::InvalidName(_)
            | ClanError::InvalidRank(_)
            | ClanError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            ClanError::DuplicateClan(_) => StatusCode::CONFLICT,
            ClanError::UnknownClan(_) | ClanError::UnknownMember { .. } => StatusCode::NOT_FOUND,
            ClanError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ClanError::InsufficientPoints { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ClanError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ClanError::ExternalCollaborator(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClanError::InvalidInput(_) => codes::INVALID_INPUT,
            ClanError::InvalidName(_) => codes::INVALID_NAME,
            ClanError::DuplicateClan(_) => codes::DUPLICATE_CLAN,
            ClanError::UnknownClan(_) => codes::UNKNOWN_CLAN,
            ClanError::UnknownMember { .. } => codes::UNKNOWN_MEMBER,
            ClanError::InvalidRank(_) => codes::INVALID_RANK,
            ClanError::Unauthorized(_) => codes::UNAUTHORIZED,
            ClanError::InsufficientPoints { .. } => codes::INSUFFICIENT_POINTS,
            ClanError::InvalidAmount(_) => codes::INVALID_AMOUNT,
            ClanError::Persistence(_) => codes::PERSISTENCE_FAILURE,
            ClanError::ExternalCollaborator(_) => codes::EXTERNAL_FAILURE,
        }
    }

    /// Get the user-facing error message.
    pub fn message(&self) -> String {
        match self {
            ClanError::InvalidInput(msg)
            | ClanError::InvalidName(msg)
            | ClanError::InvalidRank(msg)
            | ClanError::Unauthorized(msg)
            | ClanError::InvalidAmount(msg)
            | ClanError::Persistence(msg)
            | ClanError::ExternalCollaborator(msg) => msg.clone(),
            ClanError::DuplicateClan(id) => format!("A clan or room with id '{}' already exists.", id),
            ClanError::UnknownClan(name) => format!("Clan \"{}\" not found.", name),
            ClanError::UnknownMember { clan, user } => {
                format!("User '{}' is not a member of clan \"{}\".", user, clan)
            }
            ClanError::InsufficientPoints {
                clan, requested, ..
            } => format!(
                "Cannot deduct {} points from clan \"{}\" as it would result in negative points.",
                requested, clan
            ),
        }
    }

    /// Whether this failure may leave a multi-step operation needing rollback.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            ClanError::Persistence(_) | ClanError::ExternalCollaborator(_)
        )
    }
}

impl std::fmt::Display for ClanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ClanError {}

impl From<sqlx::Error> for ClanError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ClanError::Persistence(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for ClanError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        ClanError::InvalidInput(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &ClanError) -> Self {
        let details = match error {
            ClanError::InsufficientPoints {
                available,
                requested,
                ..
            } => Some(serde_json::json!({ "available": available, "requested": requested })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for ClanError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
