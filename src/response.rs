//! HTTP responses.
//!
//! A [`Response`] keeps the body in two views:
//! - the **raw** body, the bytes exactly as received (or as last serialized), and
//! - the **decoded** body, derived lazily from the raw body on first access.
//!
//! Decoding depends on `Content-Type`: a type starting with
//! `application/json` (any case) is parsed as JSON, anything else decodes to
//! the raw body as text (invalid UTF-8 replaced). The decoded value is cached until the raw body
//! changes. JSON that fails to parse is reported as [`HttpError::Decode`].
//!
//! Setting a decoded body writes the raw view straight away:
//! - objects and arrays are serialized to JSON,
//! - strings are copied verbatim and `null` becomes an empty raw body,
//! - booleans and numbers leave the raw body empty.
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use serde_json::{json, Map, Value};

use crate::errors::{HttpError, ResponseException};
use crate::message::{
    matches_class, reason_phrase, HeaderBag, HttpMessage, StatusLine, DEFAULT_PROTOCOL_VERSION,
};
use crate::request::{is_json_content_type, Request};

#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    reason_phrase: String,
    raw_body: Vec<u8>,
    decoded: OnceLock<Value>,
    headers: HeaderBag,
    protocol_version: String,
    /// Request that produced this response, when known.
    request: Option<Box<Request>>,
}

impl Response {
    /// Creates a response.
    ///
    /// Without an explicit `status` the status line found in `headers` (the
    /// last one, for redirect chains) is used, and 200 when there is none.
    pub fn new(status: Option<u16>, headers: impl Into<HeaderBag>, raw_body: impl Into<Vec<u8>>) -> Self {
        let headers = headers.into();
        let mut response = Response {
            status_code: 200,
            reason_phrase: String::new(),
            raw_body: raw_body.into(),
            decoded: OnceLock::new(),
            headers,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            request: None,
        };

        let status_line = response.headers.status_line().and_then(StatusLine::parse);
        match (status, status_line) {
            (Some(code), _) => {
                response.set_status_code(code);
            }
            (None, Some(line)) => response.apply_status_line(line),
            (None, None) => {
                response.set_status_code(200);
            }
        }

        response
    }

    /// 200 response with a JSON body.
    pub fn json(body: Value) -> Self {
        Response::new(Some(200), [("Content-Type", "application/json")], body.to_string())
    }

    /// Empty 200 response.
    pub fn success() -> Self {
        Response::new(Some(200), HeaderBag::new(), "")
    }

    /// Empty 404 response.
    pub fn not_found() -> Self {
        Response::new(Some(404), HeaderBag::new(), "")
    }

    /// Response standing in for a request that never reached a server.
    /// Status is 0 and both the reason phrase and the raw body hold the error text.
    pub fn transport_failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let mut response = Response::new(Some(0), HeaderBag::new(), error.clone());
        response.reason_phrase = error;
        response
    }

    pub fn with_status(mut self, code: u16) -> Self {
        self.set_status_code(code);
        self
    }

    /// Sets the status from `"HTTP/1.1 404 Not Found"`, `"404 Not Found"` or `"404"`.
    ///
    /// A protocol version in the line replaces the message's version. Without
    /// a reason phrase the standard phrase for the code is used.
    pub fn set_status(&mut self, status: &str) -> Result<&mut Self, HttpError> {
        let line = StatusLine::parse(status).ok_or_else(|| HttpError::InvalidStatus(status.to_string()))?;
        self.apply_status_line(line);
        Ok(self)
    }

    fn apply_status_line(&mut self, line: StatusLine) {
        if let Some(version) = line.protocol_version {
            self.protocol_version = version;
        }
        self.set_status_code(line.code);
        if let Some(reason) = line.reason {
            self.reason_phrase = reason;
        }
    }

    /// Sets the code and resets the reason phrase to the standard one.
    pub fn set_status_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.reason_phrase = reason_phrase(code).unwrap_or_default().to_string();
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    pub fn set_reason_phrase(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason_phrase = reason.into();
        self
    }

    /// `"<code> <reason>"`, e.g. `"404 Not Found"`.
    pub fn status(&self) -> String {
        format!("{} {}", self.status_code, self.reason_phrase)
            .trim()
            .to_string()
    }

    /// Checks the status against a class such as `"2xx"`, where `x` matches any digit.
    pub fn is_response_class(&self, class: &str) -> bool {
        matches_class(self.status_code, class)
    }

    pub fn is_successful(&self) -> bool {
        self.is_response_class("2xx")
    }

    /// Raw body as text. Invalid UTF-8 is replaced, see [`Response::raw_body_bytes`]
    /// for the exact bytes.
    pub fn raw_body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_body)
    }

    pub fn raw_body_bytes(&self) -> &[u8] {
        &self.raw_body
    }

    /// Replaces the raw body and drops the cached decoded body.
    pub fn set_raw_body(&mut self, raw_body: impl Into<Vec<u8>>) -> &mut Self {
        self.raw_body = raw_body.into();
        self.decoded = OnceLock::new();
        self
    }

    pub fn is_json(&self) -> bool {
        is_json_content_type(&self.header("Content-Type"))
    }

    /// Decoded body. Decoded once and cached.
    pub fn body(&self) -> Result<&Value, HttpError> {
        if let Some(body) = self.decoded.get() {
            return Ok(body);
        }

        let body = if !self.is_json() {
            Value::String(self.raw_body().into_owned())
        } else if self.raw_body.trim_ascii().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&self.raw_body)?
        };

        Ok(self.decoded.get_or_init(|| body))
    }

    /// Sets the decoded body and rewrites the raw body from it.
    pub fn set_body(&mut self, body: impl Into<Value>) -> &mut Self {
        let body = body.into();
        self.raw_body = match &body {
            Value::Object(_) | Value::Array(_) => body.to_string().into_bytes(),
            Value::String(text) => text.clone().into_bytes(),
            Value::Null | Value::Bool(_) | Value::Number(_) => Vec::new(),
        };
        self.decoded = OnceLock::from(body);
        self
    }

    /// A single field of an object body. `None` for missing fields or non-object bodies.
    pub fn body_field(&self, key: &str) -> Result<Option<&Value>, HttpError> {
        Ok(self.body()?.as_object().and_then(|body| body.get(key)))
    }

    /// Sets a single field of the body. A `null` body becomes an empty object first.
    pub fn set_body_field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self, HttpError> {
        let mut body = match self.body()? {
            Value::Object(body) => body.clone(),
            Value::Null => Map::new(),
            _ => return Err(HttpError::BodyNotObject),
        };
        body.insert(key.into(), value.into());
        Ok(self.set_body(Value::Object(body)))
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn request_mut(&mut self) -> Option<&mut Request> {
        self.request.as_deref_mut()
    }

    pub fn set_request(&mut self, request: Request) -> &mut Self {
        self.request = Some(Box::new(request));
        self
    }

    pub fn take_request(&mut self) -> Option<Request> {
        self.request.take().map(|request| *request)
    }

    pub fn into_exception(self) -> ResponseException {
        ResponseException::new(self)
    }

    pub fn as_exception(&self) -> ResponseException {
        ResponseException::new(self.clone())
    }

    /// Summary for logs, without the body.
    pub fn to_json(&self) -> Value {
        json!({
            "status": self.status(),
            "protocolVersion": self.protocol_version,
            "contentType": self.header("Content-Type"),
            "request": self.request().map(Request::to_json),
        })
    }
}

impl Default for Response {
    fn default() -> Self {
        Response::new(None, HeaderBag::new(), "")
    }
}

// The decoded cache is derived from the raw body, so it takes no part in equality.
impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.status_code == other.status_code
            && self.reason_phrase == other.reason_phrase
            && self.raw_body == other.raw_body
            && self.headers == other.headers
            && self.protocol_version == other.protocol_version
            && self.request == other.request
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_body())
    }
}

impl HttpMessage for Response {
    fn headers(&self) -> &HeaderBag {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderBag {
        &mut self.headers
    }

    fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    fn set_protocol_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.protocol_version = version.into();
        self
    }

    /// Replaces the headers. A status line in a raw header block also sets the status.
    fn set_headers(&mut self, headers: impl Into<HeaderBag>) -> &mut Self {
        self.headers = headers.into();
        if let Some(line) = self.headers.status_line().and_then(StatusLine::parse) {
            self.apply_status_line(line);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    #[test]
    fn status_line_round_trip() {
        let mut response = Response::default();
        response.set_status("HTTP/1.1 404 Not Found").unwrap();

        assert_eq!(response.status_code(), 404);
        assert_eq!(response.reason_phrase(), "Not Found");
        assert_eq!(response.protocol_version(), "1.1");
        assert_eq!(response.status(), "404 Not Found");
    }

    #[test]
    fn status_from_code_or_code_and_reason() {
        let mut response = Response::default();
        response.set_status("418").unwrap();
        assert_eq!(response.reason_phrase(), "I'm a teapot");

        response.set_status("HTTP/1.0 500 Totally Broken").unwrap();
        assert_eq!(response.status_code(), 500);
        assert_eq!(response.reason_phrase(), "Totally Broken");
        assert_eq!(response.protocol_version(), "1.0");

        assert!(matches!(response.set_status("nope"), Err(HttpError::InvalidStatus(_))));
    }

    #[test]
    fn default_status_is_200() {
        let response = Response::new(None, HeaderBag::from([("X-A", "1")]), "");
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.reason_phrase(), "OK");
    }

    #[test]
    fn status_taken_from_last_header_block() {
        let raw = "HTTP/1.1 301 Moved Permanently\r\nLocation: https://example.com/b\r\n\r\n\
                   HTTP/2 201 Created\r\nX-Final: yes\r\n\r\n";
        let response = Response::new(None, raw, "{}");

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.reason_phrase(), "Created");
        assert_eq!(response.protocol_version(), "2");
        assert_eq!(response.header("x-final"), "yes");
        assert!(!response.has_header("Location"));
    }

    #[test]
    fn set_headers_collapses_redirect_blocks() {
        let mut response = Response::success();
        response.set_headers(
            "HTTP/1.1 301 Moved Permanently\r\nLocation: /b\r\nX-Hop: 1\r\n\r\n\
             HTTP/1.1 201 Created\r\nX-Hop: 2\r\n",
        );

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header_lines("x-hop"), ["2"]);
        assert!(!response.has_header("location"));

        response.set_headers([("X-Plain", "1")]);
        assert_eq!(response.status_code(), 201);
    }

    #[test]
    fn explicit_status_wins_over_header_block() {
        let response = Response::new(Some(202), "HTTP/1.1 500 Internal Server Error\r\n", "");
        assert_eq!(response.status_code(), 202);
    }

    #[test]
    fn json_body_is_decoded_and_cached() {
        let response = Response::new(Some(200), [("Content-Type", "application/json; charset=utf-8")], r#"{"foo":"bar"}"#);

        let first = response.body().unwrap() as *const Value;
        let second = response.body().unwrap() as *const Value;
        assert_eq!(first, second);
        assert_eq!(response.body_field("foo").unwrap(), Some(&Value::from("bar")));
        assert_eq!(response.body_field("missing").unwrap(), None);
    }

    #[test]
    fn non_json_body_is_the_raw_string() {
        let response = Response::new(Some(200), [("Content-Type", "text/plain")], "hello");
        assert_eq!(response.body().unwrap(), &Value::from("hello"));
        assert_eq!(response.to_string(), "hello");
    }

    #[test]
    fn malformed_json_is_reported() {
        let response = Response::new(Some(200), [("Content-Type", "application/json")], "{not json");
        assert!(matches!(response.body(), Err(HttpError::Decode(_))));
    }

    #[test]
    fn empty_json_body_is_null() {
        let response = Response::new(Some(204), [("Content-Type", "application/json")], "");
        assert_eq!(response.body().unwrap(), &Value::Null);
    }

    #[test]
    fn set_body_keeps_views_in_sync() {
        let mut response = Response::success();

        response.set_body(json!({"a": 1}));
        assert_eq!(response.raw_body(), r#"{"a":1}"#);
        assert_eq!(response.body().unwrap(), &json!({"a": 1}));

        response.set_body("plain");
        assert_eq!(response.raw_body(), "plain");
        assert_eq!(response.body().unwrap(), &Value::from("plain"));

        response.set_body(Value::Null);
        assert_eq!(response.raw_body(), "");
        assert_eq!(response.body().unwrap(), &Value::Null);
    }

    #[test]
    fn scalar_body_leaves_raw_body_empty() {
        let mut response = Response::success();
        response.set_body(true);

        assert_eq!(response.raw_body(), "");
        assert_eq!(response.body().unwrap(), &Value::Bool(true));
    }

    #[test]
    fn set_raw_body_invalidates_cache() {
        let mut response = Response::json(json!({"v": 1}));
        assert_eq!(response.body_field("v").unwrap(), Some(&json!(1)));

        response.set_raw_body(r#"{"v":2}"#);
        assert_eq!(response.body_field("v").unwrap(), Some(&json!(2)));
    }

    #[test]
    fn set_body_field_rewrites_raw_body() {
        let mut response = Response::json(json!({"a": 1}));
        response.set_body_field("b", "two").unwrap();

        assert_eq!(response.raw_body(), r#"{"a":1,"b":"two"}"#);

        let mut text = Response::new(Some(200), [("Content-Type", "text/plain")], "hi");
        assert!(matches!(text.set_body_field("a", 1), Err(HttpError::BodyNotObject)));
    }

    #[test]
    fn response_classes() {
        assert!(Response::success().with_status(207).is_successful());
        assert!(Response::success().with_status(299).is_response_class("2xx"));
        assert!(!Response::success().with_status(301).is_successful());
        assert!(Response::success().with_status(304).is_response_class("30x"));
    }

    #[test]
    fn transport_failure_has_status_zero() {
        let response = Response::transport_failure("Could not resolve host: nowhere.invalid");

        assert_eq!(response.status_code(), 0);
        assert_eq!(response.reason_phrase(), "Could not resolve host: nowhere.invalid");
        assert_eq!(response.raw_body(), "Could not resolve host: nowhere.invalid");
        assert!(!response.is_successful());
    }

    #[test]
    fn request_back_reference() {
        let mut response = Response::success();
        assert!(response.request().is_none());

        response.set_request(Request::new(Method::Get, "https://example.com/"));
        assert_eq!(response.request().map(Request::url), Some("https://example.com/"));
        assert_eq!(response.to_json()["request"]["host"], "example.com");
    }

    #[test]
    fn binary_body_keeps_its_bytes() {
        let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a];
        let response = Response::new(Some(200), [("Content-Type", "image/png")], png.to_vec());

        assert_eq!(response.raw_body_bytes(), png);
        assert_eq!(response.raw_body(), "\u{fffd}PNG\r\n");
        assert_eq!(response.body().unwrap(), &Value::from("\u{fffd}PNG\r\n"));
    }
}
