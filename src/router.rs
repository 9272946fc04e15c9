//! Axum router construction from an API document.
//!
//! Every declared path and method is bound to a [`MockResponder`]. Document
//! path templates are rewritten with positional parameter names so paths that
//! use different names at the same position (`/users/{id}` and
//! `/users/{userId}/posts`) can share one router.

use crate::config::ServerConfig;
use crate::openapi::OpenApiDocument;
use crate::responder::MockResponder;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::RawPathParams;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// A document path template translated into axum route syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    /// Path registered with the router, e.g. `/pets/{param0}`
    pub route: String,
    /// `(route parameter, document parameter)` pairs in path order
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathPatternError {
    #[error("path must start with '/'")]
    Relative,
    #[error("segment {0:?} mixes literal text and a parameter")]
    PartialParameter(String),
    #[error("segment {0:?} has an empty parameter name")]
    EmptyParameter(String),
    #[error("segment {0:?} starts with a reserved character")]
    Reserved(String),
}

impl PathPattern {
    pub fn parse(template: &str) -> Result<Self, PathPatternError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(PathPatternError::Relative);
        };

        let mut route = String::new();
        let mut params = Vec::new();

        for segment in rest.split('/') {
            route.push('/');

            if !segment.contains(['{', '}']) {
                if segment.starts_with([':', '*']) {
                    return Err(PathPatternError::Reserved(segment.to_string()));
                }
                route.push_str(segment);
                continue;
            }

            let name = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .filter(|name| !name.contains(['{', '}']))
                .ok_or_else(|| PathPatternError::PartialParameter(segment.to_string()))?;
            if name.is_empty() {
                return Err(PathPatternError::EmptyParameter(segment.to_string()));
            }

            let route_name = format!("param{}", params.len());
            route.push('{');
            route.push_str(&route_name);
            route.push('}');
            params.push((route_name, name.to_string()));
        }

        Ok(Self { route, params })
    }

    /// Rename captured route parameters back to their document names.
    pub fn document_params<'a>(
        &self,
        captured: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> HashMap<String, String> {
        captured
            .into_iter()
            .filter_map(|(route_name, value)| {
                self.params
                    .iter()
                    .find(|(name, _)| name == route_name)
                    .map(|(_, doc_name)| (doc_name.clone(), value.to_string()))
            })
            .collect()
    }
}

/// Build the router serving every operation in `doc`.
pub fn build_router(doc: &OpenApiDocument, config: &ServerConfig) -> Router {
    let mut router = Router::new();
    let mut routed: HashMap<String, &str> = HashMap::new();

    for (path, item) in &doc.paths {
        let pattern = match PathPattern::parse(path) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(path = %path, error = %e, "Skipping path that cannot be routed");
                continue;
            }
        };
        if let Some(existing) = routed.get(&pattern.route) {
            warn!(
                path = %path,
                existing = %existing,
                "Skipping path that matches the same requests as an earlier path"
            );
            continue;
        }

        let pattern = Arc::new(pattern);
        let mut method_router = MethodRouter::new();
        let mut operations = 0;

        for (method, operation) in item.operations() {
            let Ok(filter) = MethodFilter::try_from(method.clone()) else {
                warn!(method = %method, path = %path, "Skipping unsupported method");
                continue;
            };

            info!(
                method = %method,
                path = %path,
                responses = operation.responses.len(),
                "Adding route"
            );

            let responder = Arc::new(MockResponder::new(
                path.as_str(),
                method,
                operation.responses.clone(),
                config,
            ));
            let pattern = Arc::clone(&pattern);

            method_router = method_router.on(
                filter,
                move |captured: Result<RawPathParams, RawPathParamsRejection>, headers: HeaderMap| {
                    let responder = Arc::clone(&responder);
                    let pattern = Arc::clone(&pattern);
                    async move {
                        let params = match captured {
                            Ok(raw) => pattern.document_params(&raw),
                            Err(RawPathParamsRejection::MissingPathParams(_)) => HashMap::new(),
                            Err(e) => return e.into_response(),
                        };
                        responder.respond(params, &headers).await
                    }
                },
            );
            operations += 1;
        }

        if operations > 0 {
            router = router.route(&pattern.route, method_router);
            routed.insert(pattern.route.clone(), path.as_str());
        }
    }

    info!(paths = routed.len(), "Router built");

    router
        .fallback(unmatched)
        .layer(TraceLayer::new_for_http())
}

async fn unmatched(method: Method, uri: Uri) -> Response {
    warn!(method = %method, path = %uri.path(), "No operation declared for request");
    (
        StatusCode::NOT_FOUND,
        "no operation is declared for this path",
    )
        .into_response()
}
