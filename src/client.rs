use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::errors::{HttpError, ResponseException};
use crate::message::HeaderBag;
use crate::middleware::{Middleware, MiddlewareChain, Next};
use crate::net::{ReqwestTransport, Transport};
use crate::request::{Method, Request, RequestOptions};
use crate::response::Response;

/// HTTP client.
///
/// Builds requests relative to a base URL, runs them through the middleware
/// chain and the transport, and optionally turns non-2xx responses into
/// [`ResponseException`]s.
pub struct HttpClient {
    base_url: String,
    default_headers: HeaderBag,
    default_options: RequestOptions,
    throw_exceptions: bool,
    middleware: MiddlewareChain,
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let mut client = Self {
            base_url: String::new(),
            default_headers: HeaderBag::new(),
            default_options: RequestOptions::default(),
            throw_exceptions: false,
            middleware: MiddlewareChain::new(),
            transport,
        };
        client.set_base_url(base_url);
        client
    }

    /// Client talking to the network through [`ReqwestTransport`].
    pub fn network(base_url: impl Into<String>) -> Result<Self, HttpError> {
        Ok(Self::new(base_url, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn from_config(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let mut client = Self::new(config.base_url, transport);
        if !config.user_agent.is_empty() {
            client.default_headers.set("User-Agent", config.user_agent);
        }
        for (name, value) in config.default_headers {
            client.default_headers.set(name, value);
        }
        client.default_options = config.default_options;
        client.throw_exceptions = config.throw_exceptions;
        client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets the base URL. Trailing slashes are dropped.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Value of a default header, if set.
    pub fn default_header(&self, name: &str) -> Option<String> {
        self.default_headers
            .contains(name)
            .then(|| self.default_headers.get(name))
    }

    pub fn set_default_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.default_headers.set(name, value);
        self
    }

    pub fn default_headers(&self) -> &HeaderBag {
        &self.default_headers
    }

    pub fn set_default_headers(&mut self, headers: impl Into<HeaderBag>) -> &mut Self {
        self.default_headers = headers.into();
        self
    }

    pub fn default_options(&self) -> &RequestOptions {
        &self.default_options
    }

    pub fn default_options_mut(&mut self) -> &mut RequestOptions {
        &mut self.default_options
    }

    pub fn set_default_options(&mut self, options: RequestOptions) -> &mut Self {
        self.default_options = options;
        self
    }

    pub fn throw_exceptions(&self) -> bool {
        self.throw_exceptions
    }

    pub fn set_throw_exceptions(&mut self, throw: bool) -> &mut Self {
        self.throw_exceptions = throw;
        self
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = transport;
        self
    }

    /// Wraps all middleware added so far with `middleware`.
    pub fn add_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Request, Next<'_>) -> Result<Response, HttpError> + Send + Sync + 'static,
    {
        self.middleware.push(middleware);
        self
    }

    pub fn add_layer(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Absolute URLs (anything containing `//`) are kept, everything else is
    /// appended to the base URL.
    pub fn resolve_url(&self, uri: &str) -> String {
        if uri.contains("//") {
            uri.to_string()
        } else {
            format!("{}/{}", self.base_url, uri.trim_start_matches('/'))
        }
    }

    /// Appends URL encoded `query` to `uri`.
    pub fn append_query(uri: &str, query: &[(&str, &str)]) -> String {
        if query.is_empty() {
            return uri.to_string();
        }

        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        let separator = if uri.contains('?') { '&' } else { '?' };
        format!("{uri}{separator}{encoded}")
    }

    /// Builds a request without sending it. Per-call headers replace default
    /// headers of the same name, per-call options replace default options.
    pub fn create_request(
        &self,
        method: Method,
        uri: &str,
        body: impl Into<Value>,
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Request {
        let mut merged_headers = self.default_headers.clone();
        merged_headers.replace_from(headers);

        let mut request = Request::new(method, self.resolve_url(uri))
            .with_body(body)
            .with_headers(merged_headers);
        request.apply_options(&self.default_options.merge(options));
        request
    }

    pub fn get(&self, uri: &str, query: &[(&str, &str)]) -> Result<Response, HttpError> {
        self.get_with(uri, query, &HeaderBag::new(), &RequestOptions::default())
    }

    pub fn head(&self, uri: &str, query: &[(&str, &str)]) -> Result<Response, HttpError> {
        self.head_with(uri, query, &HeaderBag::new(), &RequestOptions::default())
    }

    pub fn options(&self, uri: &str, query: &[(&str, &str)]) -> Result<Response, HttpError> {
        self.options_with(uri, query, &HeaderBag::new(), &RequestOptions::default())
    }

    pub fn delete(&self, uri: &str, query: &[(&str, &str)]) -> Result<Response, HttpError> {
        self.delete_with(uri, query, &HeaderBag::new(), &RequestOptions::default())
    }

    pub fn post(&self, uri: &str, body: impl Into<Value>) -> Result<Response, HttpError> {
        self.post_with(uri, body, &HeaderBag::new(), &RequestOptions::default())
    }

    pub fn put(&self, uri: &str, body: impl Into<Value>) -> Result<Response, HttpError> {
        self.put_with(uri, body, &HeaderBag::new(), &RequestOptions::default())
    }

    pub fn patch(&self, uri: &str, body: impl Into<Value>) -> Result<Response, HttpError> {
        self.patch_with(uri, body, &HeaderBag::new(), &RequestOptions::default())
    }

    /// [`HttpClient::get`] with per-call headers and options.
    pub fn get_with(
        &self,
        uri: &str,
        query: &[(&str, &str)],
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Get, &Self::append_query(uri, query), Value::Null, headers, options)
    }

    pub fn head_with(
        &self,
        uri: &str,
        query: &[(&str, &str)],
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Head, &Self::append_query(uri, query), Value::Null, headers, options)
    }

    pub fn options_with(
        &self,
        uri: &str,
        query: &[(&str, &str)],
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Options, &Self::append_query(uri, query), Value::Null, headers, options)
    }

    pub fn delete_with(
        &self,
        uri: &str,
        query: &[(&str, &str)],
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Delete, &Self::append_query(uri, query), Value::Null, headers, options)
    }

    /// [`HttpClient::post`] with per-call headers and options.
    pub fn post_with(
        &self,
        uri: &str,
        body: impl Into<Value>,
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Post, uri, body, headers, options)
    }

    pub fn put_with(
        &self,
        uri: &str,
        body: impl Into<Value>,
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Put, uri, body, headers, options)
    }

    pub fn patch_with(
        &self,
        uri: &str,
        body: impl Into<Value>,
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::Patch, uri, body, headers, options)
    }

    /// Builds, sends and classifies a request.
    ///
    /// A non-2xx response is returned as-is, unless exceptions are enabled
    /// (on the client, or for this call through `options`) in which case it
    /// becomes an [`HttpError::Response`].
    pub fn request(
        &self,
        method: Method,
        uri: &str,
        body: impl Into<Value>,
        headers: &HeaderBag,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        let request = self.create_request(method, uri, body, headers, options);
        let response = self.send(request)?;

        if response.is_successful() {
            return Ok(response);
        }
        self.handle_error_response(response, options)
    }

    /// Runs `request` through the middleware chain and the transport. The
    /// response is not classified.
    ///
    /// The returned response carries the request as sent, and that request
    /// carries a copy of the response without the loop back.
    pub fn send(&self, request: Request) -> Result<Response, HttpError> {
        log::debug!("Client: {} {}", request.method(), request.url());

        let transport = &self.transport;
        let terminal = |mut request: Request| -> Result<Response, HttpError> {
            let mut response = transport.send(&request);
            let mut answered = response.clone();
            answered.take_request();
            request.set_response(answered);
            response.set_request(request);
            Ok(response)
        };

        let response = self.middleware.dispatch(request, &terminal)?;
        log::debug!("Client: received {}", response.status());
        Ok(response)
    }

    /// Turns `response` into an error when exceptions are enabled for this call.
    pub fn handle_error_response(&self, response: Response, options: &RequestOptions) -> Result<Response, HttpError> {
        let throw = options
            .throw_exceptions
            .or(self.default_options.throw_exceptions)
            .unwrap_or(self.throw_exceptions);
        if !throw {
            return Ok(response);
        }

        let exception = ResponseException::new(response);
        log::warn!("Client: {}", exception);
        Err(exception.into())
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("default_options", &self.default_options)
            .field("throw_exceptions", &self.throw_exceptions)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}
