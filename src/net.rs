//! Transports: the step that actually turns a [`Request`] into a [`Response`].
mod fetch;

pub use fetch::ReqwestTransport;

use crate::request::Request;
use crate::response::Response;

/// Sends a request and returns whatever came back.
///
/// 4xx and 5xx responses are ordinary results. A transport that cannot reach
/// the server at all (DNS failure, refused connection, timeout) returns a
/// response with status code 0 whose reason phrase holds the error text.
/// Implementations never fail otherwise.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Response;
}

impl<F> Transport for F
where
    F: Fn(&Request) -> Response + Send + Sync,
{
    fn send(&self, request: &Request) -> Response {
        self(request)
    }
}
