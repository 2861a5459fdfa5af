use rusqlite;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {message}")]
    Input {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("snapshot fetch failed: {message}")]
    Fetch { message: String },

    #[error("database error: {message}")]
    Database { message: String },

    #[error("record not found")]
    NotFound,

    #[error("record conflict: {message}")]
    Conflict { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "analytics::input", %message, "input error");
        AppError::Input {
            message,
            details: None,
        }
    }

    pub fn input_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "analytics::input", %message, details = %details, "input error with details");
        AppError::Input {
            message,
            details: Some(details),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "analytics::fetch", %message, "snapshot fetch failed");
        AppError::Fetch { message }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "analytics::db", %message, "conflict error");
        AppError::Conflict { message }
    }

    pub fn not_found() -> Self {
        warn!(target: "analytics::db", "resource not found");
        AppError::NotFound
    }

    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "analytics::db", %message, "database error");
        AppError::Database { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "analytics::other", %message, "unexpected error");
        AppError::Other(message)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::{QueryReturnedNoRows, SqliteFailure};
        use rusqlite::ErrorCode;

        match &error {
            QueryReturnedNoRows => AppError::not_found(),
            SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                AppError::conflict("uniqueness or constraint violation")
            }
            _ => {
                error!(target: "analytics::db", error = ?error, "sqlite error");
                AppError::database(error.to_string())
            }
        }
    }
}
