use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::response::ErrorBody;

/// API error taxonomy.
///
/// Each tag carries a fixed HTTP status; apps and libraries raise these (or
/// convert into them) so every service marshals failures the same way.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{message}")]
    BadRequest {
        message: String,
        debug_message: Option<String>,
    },

    #[error("{message}")]
    Unauthorised {
        message: String,
        debug_message: Option<String>,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        debug_message: Option<String>,
    },

    #[error("{message}")]
    Server {
        message: String,
        debug_message: Option<String>,
    },
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::BadRequest { message: message.into(), debug_message: None }
    }

    pub fn unauthorised(message: impl Into<String>) -> Self {
        HttpError::Unauthorised { message: message.into(), debug_message: None }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::NotFound { message: message.into(), debug_message: None }
    }

    pub fn server(message: impl Into<String>) -> Self {
        HttpError::Server { message: message.into(), debug_message: None }
    }

    /// Attach an operator-facing detail message, kept separate from the
    /// client-facing one.
    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        match &mut self {
            HttpError::BadRequest { debug_message, .. }
            | HttpError::Unauthorised { debug_message, .. }
            | HttpError::NotFound { debug_message, .. }
            | HttpError::Server { debug_message, .. } => *debug_message = Some(debug.into()),
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            HttpError::Unauthorised { .. } => StatusCode::UNAUTHORIZED,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HttpError::BadRequest { message, .. }
            | HttpError::Unauthorised { message, .. }
            | HttpError::NotFound { message, .. }
            | HttpError::Server { message, .. } => message,
        }
    }

    pub fn debug_message(&self) -> Option<&str> {
        match self {
            HttpError::BadRequest { debug_message, .. }
            | HttpError::Unauthorised { debug_message, .. }
            | HttpError::NotFound { debug_message, .. }
            | HttpError::Server { debug_message, .. } => debug_message.as_deref(),
        }
    }

    /// Build the response body for this error.
    pub fn marshal(&self) -> ErrorBody {
        ErrorBody {
            message: self.message().to_string(),
            debug_message: self.debug_message().map(str::to_string),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        tracing::error!("API error: {:?}", self);

        (self.status_code(), Json(self.marshal())).into_response()
    }
}

// Internal failures surface to API callers as opaque server errors, with the
// detail kept on the debug side.
impl From<crate::error::Error> for HttpError {
    fn from(err: crate::error::Error) -> Self {
        HttpError::server("Internal server error").with_debug(err.to_string())
    }
}
