//! OpenAPI Mock Server
//!
//! Serves plausible responses for every operation declared in an OpenAPI
//! document, so clients can be built and tested before the real service
//! exists.
//!
//! # Features
//!
//! - **Response Selection**: The lowest declared status code by default, or the
//!   one named in an `X-Mock-Response` header
//! - **Example Templates**: JSON examples are rendered with path parameters,
//!   random values and repeated array items
//! - **Latency Simulation**: `X-Mock-Latency` delays a response by the given milliseconds
//! - **Array Sizing**: `X-Mock-Count` sets how many items `JSONArray` produces
//!
//! # Example Document
//!
//! ```yaml
//! paths:
//!   /users/{id}:
//!     get:
//!       responses:
//!         '200':
//!           description: A user
//!           content:
//!             application/json:
//!               example: '{"id":"{{.Params.id}}","name":"{{.RandomFirstName}}"}'
//!         '404':
//!           description: No such user
//! ```

pub mod config;
pub mod error;
pub mod openapi;
pub mod random;
pub mod responder;
pub mod router;
pub mod selector;
pub mod server;
pub mod template;

pub use config::{ServerConfig, SpecSource};
pub use openapi::OpenApiDocument;
pub use responder::MockResponder;
pub use router::build_router;
