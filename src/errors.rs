use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// The caller did not supply a user identifier.
    MissingIdentifier,
    /// Neither the user record nor the submission log produced a profile.
    ProfileNotFound(String),
    /// Amount or term could not be parsed.
    InvalidLoanParameters(String),
    /// The decision engine answered with a non-success status.
    /// Carries whatever body text could be read.
    ServiceUnavailable(String),
    /// The network call itself failed (connect, timeout, serialization).
    TransportFailure(String),
    /// Profile store errors.
    DatabaseError(sqlx::Error),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingIdentifier => write!(f, "Kullanıcı girişi gerekli"),
            AppError::ProfileNotFound(_) => write!(f, "Kullanıcı profili bulunamadı"),
            AppError::InvalidLoanParameters(msg) => write!(f, "Invalid loan parameters: {}", msg),
            AppError::ServiceUnavailable(body) => write!(
                f,
                "Kredi değerlendirme servisi geçici olarak kullanılamıyor. {}",
                body
            ),
            AppError::TransportFailure(msg) => write!(f, "Transport failure: {}", msg),
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_message) = match self {
            AppError::MissingIdentifier => {
                tracing::warn!("Credit analysis requested without a user id");
                (StatusCode::UNAUTHORIZED, message)
            }
            AppError::ProfileNotFound(uid) => {
                tracing::warn!("No profile available for uid {}", uid);
                (StatusCode::NOT_FOUND, message)
            }
            AppError::InvalidLoanParameters(_) => (StatusCode::BAD_REQUEST, message),
            AppError::ServiceUnavailable(body) => {
                tracing::error!("Decision engine unavailable: {}", body);
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            AppError::TransportFailure(msg) => {
                tracing::error!("Transport failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "External service error".to_string())
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain, respond as the underlying error
                tracing::error!("Error with context: {} -> {}", context, source);
                return (*source).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}
