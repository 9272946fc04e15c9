//! End-to-end tests for the mock server.
//!
//! Requests go through the full router via `tower::ServiceExt` without
//! starting a TCP server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use openapi_mock_server::random::FIRST_NAMES;
use openapi_mock_server::{build_router, OpenApiDocument, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

const DOCUMENT: &str = r#"
openapi: 3.0.0
info:
  title: Users
  version: 1.0.0
paths:
  /health:
    get:
      responses:
        '200':
          description: ok
  /users:
    get:
      summary: List users
      responses:
        '200':
          description: A page of users
          content:
            application/json:
              example: '{{.JSONArray .ItemCount `{"id":{{.Index}},"name":"{{.RandomFirstName}}"}`}}'
        '404':
          description: No users
        default:
          description: Unexpected error
    post:
      responses:
        '201':
          description: Created
          content:
            application/json:
              example: '{"password":"{{.RandomPassword 12}}","role":"{{.RandomFrom "admin" "viewer"}}"}'
        '400':
          description: Invalid user
  /users/{userId}:
    get:
      responses:
        '404':
          description: No such user
        '200':
          description: One user
          content:
            application/json:
              example: '{"id":"{{.Params.userId}}","handle":"{{.ToLower .Params.userId}}"}'
    delete:
      responses:
        '204':
          description: Deleted
  /users/{id}/posts:
    get:
      responses:
        '200':
          description: Posts by a user
          content:
            application/json:
              example:
                owner: '{{.Params.id}}'
                role: '{{.RandomFrom "admin" "viewer"}}'
                pinned: true
  /broken:
    get:
      responses:
        '200':
          description: Broken example
          content:
            application/json:
              example: '{"a": {{.Nope}}}'
  /nothing:
    get:
      responses:
        default:
          description: Only a default
"#;

fn app() -> Router {
    let doc = OpenApiDocument::from_yaml(DOCUMENT).unwrap();
    build_router(&doc, &ServerConfig::default())
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::get(uri)
}

async fn send(request: Request<Body>) -> axum::response::Response {
    app().oneshot(request).await.unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_response_without_example() {
    let response = send(get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-mock-description"], "ok");
    assert!(response.headers().get("content-type").is_none());
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn test_lowest_status_selected_by_default() {
    let response = send(get("/users/abc").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-mock-description"], "One user");
    assert_eq!(response.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn test_override_header_selects_declared_response() {
    let response = send(
        get("/users")
            .header("X-Mock-Response", "404")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-mock-description"], "No users");
}

#[tokio::test]
async fn test_undeclared_override_is_bad_request() {
    let response = send(
        get("/users")
            .header("X-Mock-Response", "999")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_default_override_is_bad_request() {
    let response = send(
        get("/users")
            .header("X-Mock-Response", "default")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_count_header_builds_array_of_named_objects() {
    let response = send(
        get("/users")
            .header("X-Mock-Count", "3")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let users = json.as_array().unwrap();
    assert_eq!(users.len(), 3);

    for (i, user) in users.iter().enumerate() {
        assert_eq!(user["id"], i as u64 + 1);
        assert!(FIRST_NAMES.contains(&user["name"].as_str().unwrap()));
    }
}

#[tokio::test]
async fn test_invalid_count_defaults_to_one() {
    let response = send(
        get("/users")
            .header("X-Mock-Count", "lots")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_negative_count_gives_empty_array() {
    let response = send(
        get("/users")
            .header("X-Mock-Count", "-2")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "[]");
}

#[tokio::test]
async fn test_invalid_latency_is_ignored() {
    let response = send(
        get("/health")
            .header("X-Mock-Latency", "soon")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_path_parameters_reach_template() {
    let response = send(get("/users/Ada%20L").body(Body::empty()).unwrap()).await;

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["id"], "Ada L");
    assert_eq!(json["handle"], "ada l");
}

#[tokio::test]
async fn test_parameter_names_differ_between_paths() {
    let response = send(get("/users/7/posts").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["owner"], "7");
    assert!(["admin", "viewer"].contains(&json["role"].as_str().unwrap()));
    assert_eq!(json["pinned"], true);
}

#[tokio::test]
async fn test_random_values_in_post_example() {
    let response = send(Request::post("/users").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["password"].as_str().unwrap().len(), 12);
    assert!(["admin", "viewer"].contains(&json["role"].as_str().unwrap()));
}

#[tokio::test]
async fn test_delete_without_body() {
    let response = send(Request::delete("/users/7").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["x-mock-description"], "Deleted");
}

#[tokio::test]
async fn test_broken_example_keeps_status() {
    let response = send(get("/broken").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn test_only_default_declared() {
    let response = send(get("/nothing").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_unknown_path_and_method() {
    let response = send(get("/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(Request::put("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn test_document_round_trip_through_router_builds() {
    let doc = OpenApiDocument::from_yaml(DOCUMENT).unwrap();
    assert_eq!(doc.operations().count(), 8);
    tokio_test::block_on(async {
        let response = build_router(&doc, &ServerConfig::default())
            .oneshot(get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    });
}
