//! Error types for response selection, template rendering and document loading.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors from choosing which declared response to return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The client asked for a response key the operation does not declare.
    #[error("no response available for requested status code {0:?}")]
    NoSuchResponse(String),

    /// A response key that must be a status code is not one.
    #[error("response key {0:?} is not a numeric status code")]
    InvalidStatusKey(String),

    /// The operation declares nothing that can be selected by default.
    #[error("operation declares no responses with a numeric status code")]
    NoResponsesDeclared,
}

impl SelectionError {
    /// HTTP status used when this error is returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoSuchResponse(_) | Self::InvalidStatusKey(_) | Self::NoResponsesDeclared => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for SelectionError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Errors from parsing or executing an example template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Malformed template syntax.
    #[error("template: {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// The template parsed but could not be evaluated.
    #[error("template: {0}")]
    Exec(String),
}

/// Errors from loading an API document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("neither a path or URL to an OpenAPI spec file was provided")]
    NoSource,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid API document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_error_status() {
        assert_eq!(
            SelectionError::NoSuchResponse("999".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SelectionError::InvalidStatusKey("default".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SelectionError::NoResponsesDeclared.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_parse_error_message() {
        let err = TemplateError::Parse {
            line: 2,
            column: 5,
            message: "unclosed action".to_string(),
        };
        assert_eq!(err.to_string(), "template: 2:5: unclosed action");
    }
}
