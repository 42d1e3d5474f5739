use serde_json::{json, Value};

use crate::message::HttpMessage;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid status line: {0}")]
    InvalidStatus(String),

    #[error("Invalid mock pattern: {0}")]
    InvalidMockPattern(String),

    #[error("Cannot decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response body is not an object")]
    BodyNotObject,

    #[error("Transport setup failed: {0}")]
    TransportSetup(String),

    #[error("Middleware error: {0}")]
    Middleware(String),

    #[error(transparent)]
    Response(Box<ResponseException>),
}

impl From<ResponseException> for HttpError {
    fn from(exception: ResponseException) -> Self {
        HttpError::Response(Box::new(exception))
    }
}

/// Raised for a non-2xx response when the caller asked for exceptions.
///
/// Holds the complete response, which in turn carries the request that
/// produced it (when known).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ResponseException {
    message: String,
    response: Response,
}

impl ResponseException {
    pub fn new(response: Response) -> Self {
        let subject = match response.request() {
            Some(request) => format!("Request \"{} {}\"", request.method(), request.url()),
            None => "Unknown request".to_string(),
        };

        let custom = match response.body() {
            Ok(Value::Object(body)) => body.get("message").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        let detail = match custom {
            Some(message) => format!("a custom message of \"{message}\""),
            None => format!("a standard message of \"{}\"", response.reason_phrase()),
        };

        let message = format!(
            "{subject} failed with a response code of {} and {detail}",
            response.status_code()
        );

        Self { message, response }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> u16 {
        self.response.status_code()
    }

    /// Error code, which is always the status code.
    pub fn code(&self) -> u16 {
        self.response.status_code()
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn request(&self) -> Option<&Request> {
        self.response.request()
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    /// Structured form for log sinks.
    ///
    /// The `response` object always lists the `cf-ray` and `cf-cache-status`
    /// headers, with `null` for the ones that are missing.
    pub fn to_json(&self) -> Value {
        let response = &self.response;
        let optional_header = |name: &str| {
            response
                .has_header(name)
                .then(|| response.header(name))
        };

        json!({
            "message": self.message,
            "status": self.status(),
            "code": self.code(),
            "class": std::any::type_name::<Self>(),
            "request": self.request().map(Request::to_json),
            "response": {
                "statusCode": response.status_code(),
                "content-type": optional_header("content-type"),
                "body": response.raw_body(),
                "cf-ray": optional_header("cf-ray"),
                "cf-cache-status": optional_header("cf-cache-status"),
            },
        })
    }
}
