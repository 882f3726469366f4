use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Backend query failed or returned something unreadable.
    Db(sqlx::Error),
    /// Backend unreachable or a subscription dropped.
    Connectivity(String),
    /// Rejected before any write, e.g. check-in with no active meeting.
    Validation(String),
    /// The calling surface may not perform this action.
    PermissionDenied(String),
    /// The projector has not announced itself on the presence channel.
    NotConnected,
    Storage(String),
    Session(String),
    NotFound,
}

impl AppError {
    /// Stable tag so clients can tell the alert conditions apart.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Db(_) | AppError::Connectivity(_) => "connectivity",
            AppError::Validation(_) => "validation",
            AppError::PermissionDenied(_) => "permission",
            AppError::NotConnected => "not_connected",
            AppError::Storage(_) => "storage",
            AppError::Session(_) => "session",
            AppError::NotFound => "not_found",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Connectivity(e) => write!(f, "Backend unreachable: {e}"),
            AppError::Validation(e) => write!(f, "{e}"),
            AppError::PermissionDenied(e) => write!(f, "Not permitted: {e}"),
            AppError::NotConnected => write!(f, "Projector is not connected"),
            AppError::Storage(e) => write!(f, "Storage error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::NotFound => write!(f, "Not found"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Db(_) | AppError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotConnected => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Db(_) | AppError::Connectivity(_) | AppError::Storage(_) | AppError::Session(_) => {
                log::error!("{self}");
            }
            _ => log::warn!("{self}"),
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "ok": false,
            "kind": self.kind(),
            "error": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Connectivity(e.to_string())
            }
            other => AppError::Db(other),
        }
    }
}

impl From<actix_session::SessionGetError> for AppError {
    fn from(e: actix_session::SessionGetError) -> Self {
        AppError::Session(e.to_string())
    }
}

impl From<actix_session::SessionInsertError> for AppError {
    fn from(e: actix_session::SessionInsertError) -> Self {
        AppError::Session(e.to_string())
    }
}
