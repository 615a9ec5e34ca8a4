use askama::Template;
use axum::{
    extract::{rejection::QueryRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid query string: {0}")]
    InvalidQuery(#[from] QueryRejection),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Facebook authorization was declined: {0}")]
    AuthorizationDeclined(String),

    // Build with `reqwest::Error::without_url`; token URLs carry the app secret.
    #[error("Request to Facebook failed: {0}")]
    Transport(reqwest::Error),

    #[error("Facebook returned an error: {0}")]
    Upstream(String),

    #[error("Malformed response from Facebook: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Failed to render page: {0}")]
    Render(#[from] askama::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_)
            | AppError::InvalidQuery(_)
            | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::AuthorizationDeclined(_) => StatusCode::FORBIDDEN,
            AppError::Transport(_) | AppError::Upstream(_) | AppError::MalformedResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What every visitor sees. The full message is only shown in debug mode.
    pub fn summary(&self) -> String {
        match self {
            AppError::MissingParameter(_) => self.to_string(),
            AppError::InvalidQuery(_) => "The query string could not be parsed.".to_string(),
            AppError::InvalidState(_) => {
                "This sign-in link is invalid or has expired. Please start over.".to_string()
            }
            AppError::AuthorizationDeclined(_) => {
                "Facebook authorization was declined.".to_string()
            }
            AppError::Transport(_) => "Could not reach Facebook.".to_string(),
            AppError::Upstream(_) | AppError::MalformedResponse(_) => {
                "Facebook returned an error.".to_string()
            }
            AppError::Render(_) => "Something went wrong.".to_string(),
        }
    }
}

/// Attached to error responses so [`show_details`] can re-render them.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub summary: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    reason: &'a str,
    summary: &'a str,
    detail: Option<&'a str>,
}

fn error_page(status: StatusCode, summary: &str, detail: Option<&str>) -> Response {
    let page = ErrorTemplate {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error"),
        summary,
        detail,
    };

    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            warn!("Failed to render error page: {}", e);
            (status, summary.to_string()).into_response()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!("Request failed ({}): {}", status, self);

        let details = ErrorDetails {
            summary: self.summary(),
            message: self.to_string(),
        };
        let mut response = error_page(status, &details.summary, None);
        response.extensions_mut().insert(details);
        response
    }
}

/// Middleware: adds the underlying error message to error pages when
/// `config.debug` is set.
pub async fn show_details(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(details) = response.extensions_mut().remove::<ErrorDetails>() else {
        return response;
    };
    if !config.debug {
        return response;
    }
    error_page(response.status(), &details.summary, Some(&details.message))
}
