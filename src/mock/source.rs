use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::request::Request;
use crate::response::Response;

/// Builds a response from the request being answered.
pub type ResponseFn = dyn Fn(&Request) -> Response + Send + Sync;

/// Where a mock gets its response from.
#[derive(Clone)]
pub enum ResponseSource {
    /// The same response every time.
    Fixed(Response),
    /// Responses handed out front to back. Once empty, the mock answers 404.
    Sequence(ResponseSequence),
    /// A function of the incoming request.
    Computed(Arc<ResponseFn>),
}

impl ResponseSource {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        ResponseSource::Computed(Arc::new(f))
    }
}

impl fmt::Debug for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSource::Fixed(response) => f.debug_tuple("Fixed").field(response).finish(),
            ResponseSource::Sequence(sequence) => f.debug_tuple("Sequence").field(sequence).finish(),
            ResponseSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<Response> for ResponseSource {
    fn from(response: Response) -> Self {
        ResponseSource::Fixed(response)
    }
}

impl From<ResponseSequence> for ResponseSource {
    fn from(sequence: ResponseSequence) -> Self {
        ResponseSource::Sequence(sequence)
    }
}

/// A bare value is answered as a 200 JSON response.
impl From<Value> for ResponseSource {
    fn from(body: Value) -> Self {
        ResponseSource::Fixed(Response::json(body))
    }
}

/// Queue of responses for one mock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSequence {
    queue: VecDeque<Response>,
}

impl ResponseSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, response: Response) -> Self {
        self.queue.push_back(response);
        self
    }

    /// Queues a 200 JSON response with `body`.
    pub fn push_json(self, body: Value) -> Self {
        self.push(Response::json(body))
    }

    /// Removes and returns the next response.
    pub fn take(&mut self) -> Option<Response> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl FromIterator<Response> for ResponseSequence {
    fn from_iter<I: IntoIterator<Item = Response>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HttpMessage;
    use crate::request::Method;
    use serde_json::json;

    #[test]
    fn sequence_is_consumed_front_to_back() {
        let mut sequence = ResponseSequence::new()
            .push(Response::success().with_status(201))
            .push_json(json!({"n": 2}));
        assert_eq!(sequence.len(), 2);

        assert_eq!(sequence.take().unwrap().status_code(), 201);
        let second = sequence.take().unwrap();
        assert_eq!(second.header("content-type"), "application/json");
        assert_eq!(second.raw_body(), r#"{"n":2}"#);
        assert!(sequence.take().is_none());
        assert!(sequence.is_empty());
    }

    #[test]
    fn values_become_json_responses() {
        let source = ResponseSource::from(json!(["a"]));
        let ResponseSource::Fixed(response) = source else {
            panic!("expected a fixed response");
        };
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body().unwrap(), &json!(["a"]));
    }

    #[test]
    fn computed_sources_see_the_request() {
        let source = ResponseSource::computed(|request: &Request| Response::json(json!({"url": request.url()})));
        let ResponseSource::Computed(f) = &source else {
            panic!("expected a computed response");
        };

        let response = f(&Request::new(Method::Get, "/echo"));
        assert_eq!(response.body_field("url").unwrap(), Some(&json!("/echo")));
        assert_eq!(format!("{source:?}"), "Computed(..)");
    }
}
