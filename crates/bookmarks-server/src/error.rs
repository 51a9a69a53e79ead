use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bookmarks_shared::BookmarkError;
use serde::Serialize;
use thiserror::Error;

pub const PROBLEM_JSON: &str = "application/problem+json";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] BookmarkError),

    #[error("No authenticated user in request header '{0}'")]
    Unauthenticated(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// RFC 7807 problem document.
#[derive(Debug, Serialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                BookmarkError::Validation(_)
                | BookmarkError::Hierarchy(_)
                | BookmarkError::Conflict(_) => StatusCode::BAD_REQUEST,
                BookmarkError::NotFound(_) => StatusCode::NOT_FOUND,
                BookmarkError::Backend(_) | BookmarkError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.kind(),
            other => other.status().canonical_reason().unwrap_or("Error"),
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Domain(BookmarkError::Backend(_) | BookmarkError::Internal(_)) => {
                "An internal error occurred".to_string()
            }
            ApiError::Domain(e) => e.detail().to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let problem = ProblemDetail {
            problem_type: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: self.detail(),
            instance: None,
        };
        let body = serde_json::to_vec(&problem).unwrap_or_default();

        (status, [(header::CONTENT_TYPE, PROBLEM_JSON)], body).into_response()
    }
}
