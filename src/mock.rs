//! Request mocking.
//!
//! A [`MockHandler`] is a [`Transport`](crate::net::Transport) that answers
//! from a registry of request patterns instead of the network. For every
//! request, all patterns are scored and the most specific one wins; ties go
//! to the pattern registered first. When nothing matches, the handler answers
//! with a 404.
//!
//! ```
//! use gosub_http::{MockHttpClient, Response, ResponseSequence};
//! use serde_json::json;
//!
//! let client = MockHttpClient::new("https://api.example.com");
//! client.add_mock_request("GET /users/*", json!({"id": 1})).unwrap();
//! client
//!     .add_mock_request(
//!         "POST /users",
//!         ResponseSequence::new().push(Response::success().with_status(201)),
//!     )
//!     .unwrap();
//!
//! let response = client.get("/users/1", &[]).unwrap();
//! assert_eq!(response.body_field("id").unwrap(), Some(&json!(1)));
//! ```
mod client;
mod handler;
mod pattern;
mod source;

pub use client::MockHttpClient;
pub use handler::{MockHandler, MockMatch};
pub use pattern::MockPattern;
pub use source::{ResponseSequence, ResponseSource};
