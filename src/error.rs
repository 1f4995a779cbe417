use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DwhExportError {
    #[error("access token mismatch")]
    AuthFailure,

    #[error("{0}")]
    InvalidWindow(String),

    #[error("The 'start' and 'end' timestamps must be aligned to the given interval!")]
    MisalignedWindow,

    #[error("You must either specify 'start' and 'end' or 'range' and 'offset', but not both!")]
    ConflictingParameters,

    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("Unknown query variable: {0}")]
    UnknownQueryVariable(String),

    #[error("No match found for database. You can specify the database directly as well")]
    DatabaseNotResolvable,

    #[error("Unexpected result shape: {0}")]
    UnexpectedShape(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for DwhExportError {
    fn from(err: reqwest::Error) -> Self {
        DwhExportError::Database(err.to_string())
    }
}

impl From<toml::de::Error> for DwhExportError {
    fn from(err: toml::de::Error) -> Self {
        DwhExportError::Config(err.to_string())
    }
}

impl IntoResponse for DwhExportError {
    fn into_response(self) -> Response {
        let status = match self {
            DwhExportError::AuthFailure => return StatusCode::FORBIDDEN.into_response(),
            DwhExportError::InvalidWindow(_)
            | DwhExportError::MisalignedWindow
            | DwhExportError::ConflictingParameters
            | DwhExportError::InvalidDuration { .. } => StatusCode::BAD_REQUEST,
            DwhExportError::UnknownQueryVariable(_)
            | DwhExportError::DatabaseNotResolvable
            | DwhExportError::UnexpectedShape(_)
            | DwhExportError::Database(_)
            | DwhExportError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DwhExportError>;
