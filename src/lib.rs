//! Blocking HTTP client with a case-insensitive message model, a middleware
//! pipeline and a scoring request mocker.
pub mod client;
pub mod config;
pub mod errors;
pub mod message;
pub mod middleware;
pub mod mock;
pub mod net;
pub mod request;
pub mod response;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use errors::{HttpError, ResponseException};
pub use message::{HeaderBag, HttpMessage};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use mock::{MockHandler, MockHttpClient, MockPattern, ResponseSequence, ResponseSource};
pub use net::{ReqwestTransport, Transport};
pub use request::{Auth, Method, Request, RequestOptions};
pub use response::Response;
