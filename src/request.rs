//! Outgoing HTTP requests.
//!
//! A [`Request`] holds everything a transport needs: method, URL, body,
//! headers and the per-request options (timeouts, TLS verification, basic
//! auth, protocol version). The body is stored as given and only encoded by
//! the transport.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::errors::HttpError;
use crate::message::{HeaderBag, HttpMessage, DEFAULT_PROTOCOL_VERSION};
use crate::response::Response;

/// HTTP request method. Only these seven methods are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = HttpError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(HttpError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
            Method::Options => http::Method::OPTIONS,
        }
    }
}

/// Basic authentication credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl Auth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }
}

/// Request options. Every field is optional so that a set of options can be
/// laid over another one (see [`RequestOptions::merge`]).
///
/// Deserializes from camelCase keys. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
    /// Total timeout in seconds. 0 means unbounded.
    pub timeout: Option<u64>,
    /// Connect timeout in seconds. 0 means unbounded.
    pub connect_timeout: Option<u64>,
    pub verify_peer: Option<bool>,
    pub auth: Option<Auth>,
    pub protocol_version: Option<String>,
    /// Overrides the client's exception setting for one call.
    #[serde(alias = "throw")]
    pub throw_exceptions: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns these options with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &RequestOptions) -> RequestOptions {
        RequestOptions {
            timeout: overrides.timeout.or(self.timeout),
            connect_timeout: overrides.connect_timeout.or(self.connect_timeout),
            verify_peer: overrides.verify_peer.or(self.verify_peer),
            auth: overrides.auth.clone().or_else(|| self.auth.clone()),
            protocol_version: overrides
                .protocol_version
                .clone()
                .or_else(|| self.protocol_version.clone()),
            throw_exceptions: overrides.throw_exceptions.or(self.throw_exceptions),
        }
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout = Some(seconds);
        self
    }

    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = Some(verify);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    pub fn throw_exceptions(mut self, throw: bool) -> Self {
        self.throw_exceptions = Some(throw);
        self
    }
}

/// An HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: String,
    body: Value,
    headers: HeaderBag,
    protocol_version: String,
    timeout: u64,
    connect_timeout: u64,
    verify_peer: bool,
    auth: Option<Auth>,
    /// Response produced for this request. Set after dispatch, never at
    /// construction: on the request attached to a client response, and on
    /// mock history entries.
    response: Option<Box<Response>>,
}

impl Request {
    /// Creates a request with no body, no headers and default options.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: Value::Null,
            headers: HeaderBag::new(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            timeout: 0,
            connect_timeout: 0,
            verify_peer: true,
            auth: None,
            response: None,
        }
    }

    /// Creates a request from its parts. The method name is matched
    /// case-insensitively and must be one of the supported methods.
    pub fn from_parts(
        method: &str,
        url: impl Into<String>,
        body: impl Into<Value>,
        headers: impl Into<HeaderBag>,
        options: &RequestOptions,
    ) -> Result<Self, HttpError> {
        let mut request = Request::new(method.parse()?, url);
        request.body = body.into();
        request.headers = headers.into();
        request.apply_options(options);
        Ok(request)
    }

    /// Applies the options that are set. Unset options keep their current value.
    pub fn apply_options(&mut self, options: &RequestOptions) -> &mut Self {
        if let Some(timeout) = options.timeout {
            self.timeout = timeout;
        }
        if let Some(connect_timeout) = options.connect_timeout {
            self.connect_timeout = connect_timeout;
        }
        if let Some(verify_peer) = options.verify_peer {
            self.verify_peer = verify_peer;
        }
        if let Some(auth) = &options.auth {
            self.auth = Some(auth.clone());
        }
        if let Some(version) = &options.protocol_version {
            self.protocol_version = version.clone();
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: impl Into<HeaderBag>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Host part of the URL, lowercased. The `Host` header is not consulted.
    /// `None` for path-only and unparsable URLs.
    pub fn host(&self) -> Option<String> {
        let target = RequestTarget::parse(&self.url).ok()?;
        target.host().map(str::to_string)
    }

    pub(crate) fn target(&self) -> Result<RequestTarget, url::ParseError> {
        RequestTarget::parse(&self.url)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Value>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// True when the `Content-Type` header declares JSON.
    pub fn is_json(&self) -> bool {
        is_json_content_type(&self.header("Content-Type"))
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn set_timeout(&mut self, seconds: u64) -> &mut Self {
        self.timeout = seconds;
        self
    }

    pub fn connect_timeout(&self) -> u64 {
        self.connect_timeout
    }

    pub fn set_connect_timeout(&mut self, seconds: u64) -> &mut Self {
        self.connect_timeout = seconds;
        self
    }

    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    pub fn set_verify_peer(&mut self, verify: bool) -> &mut Self {
        self.verify_peer = verify;
        self
    }

    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    pub fn set_auth(&mut self, auth: Option<Auth>) -> &mut Self {
        self.auth = auth;
        self
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    pub fn set_response(&mut self, response: Response) -> &mut Self {
        self.response = Some(Box::new(response));
        self
    }

    /// Compact view used in logs and exception payloads.
    pub fn to_json(&self) -> Value {
        json!({
            "url": self.url,
            "host": self.host(),
            "method": self.method.as_str(),
        })
    }
}

impl HttpMessage for Request {
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
}

pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("application/json")
}

/// Base that relative request URLs are resolved against. Its host is never reported.
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// A request URL parsed the way it goes out on the wire: dot segments
/// resolved, host lowercased, reserved characters percent-encoded.
///
/// Absolute and scheme-relative URLs keep their host. Path-only URLs are
/// resolved against a placeholder base and report no host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTarget {
    url: Url,
    has_host: bool,
}

impl RequestTarget {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        match Url::parse(raw) {
            Ok(url) => Ok(Self {
                has_host: url.has_host(),
                url,
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let url = Url::parse(RELATIVE_BASE)?.join(raw)?;
                Ok(Self {
                    has_host: raw.trim_start().starts_with("//"),
                    url,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str().filter(|_| self.has_host)
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Decoded query parameters. A repeated name keeps its last value.
    pub fn query(&self) -> HashMap<String, String> {
        self.url.query_pairs().into_owned().collect()
    }
}
