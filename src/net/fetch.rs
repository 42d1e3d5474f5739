use std::time::Duration;

use http::Version;
use reqwest::redirect;
use tokio::runtime::Runtime;

use crate::errors::HttpError;
use crate::message::{HeaderBag, HttpMessage};
use crate::net::Transport;
use crate::request::{Method, Request};
use crate::response::Response;

const MAX_REDIRECTS: usize = 10;

/// Network transport backed by `reqwest`.
///
/// Every call blocks on a private single-threaded tokio runtime, so `send`
/// must not be called from inside another tokio runtime.
#[derive(Debug)]
pub struct ReqwestTransport {
    runtime: Runtime,
    use_system_proxy: bool,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, HttpError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| HttpError::TransportSetup(e.to_string()))?;

        Ok(Self {
            runtime,
            use_system_proxy: true,
        })
    }

    /// Ignores proxies configured through the environment.
    pub fn no_proxy(mut self) -> Self {
        self.use_system_proxy = false;
        self
    }

    async fn fetch(&self, request: &Request) -> Result<Response, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(!request.verify_peer());
        if request.connect_timeout() > 0 {
            builder = builder.connect_timeout(Duration::from_secs(request.connect_timeout()));
        }
        if !self.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        let mut req = client
            .request(request.method().into(), request.url())
            .version(wire_version(request.protocol_version()));
        if request.timeout() > 0 {
            req = req.timeout(Duration::from_secs(request.timeout()));
        }
        if let Some(auth) = request.auth() {
            req = req.basic_auth(&auth.username, auth.password.as_ref());
        }
        for (name, values) in request.headers().iter() {
            for value in values {
                req = req.header(name, value);
            }
        }
        req = encode_body(req, request);

        let res = req.send().await?;

        // Fetch results
        let status = res.status().as_u16();
        let version = version_string(res.version());
        let headers: HeaderBag = res
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        // We don't do streaming
        let body = res.bytes().await?;

        let mut response = Response::new(Some(status), headers, body.to_vec());
        response.set_protocol_version(version);
        Ok(response)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &Request) -> Response {
        log::debug!("Net[reqwest]: {} {}", request.method(), request.url());

        match self.runtime.block_on(self.fetch(request)) {
            Ok(response) => response,
            Err(e) => {
                let text = error_chain(&e);
                log::warn!("Net[reqwest]: {} {} failed: {}", request.method(), request.url(), text);
                Response::transport_failure(text)
            }
        }
    }
}

/// Strings are sent as-is. Structured bodies are JSON encoded when the
/// request says so, form encoded otherwise.
fn encode_body(req: reqwest::RequestBuilder, request: &Request) -> reqwest::RequestBuilder {
    if matches!(request.method(), Method::Get | Method::Head) {
        return req;
    }

    match request.body() {
        serde_json::Value::Null => req,
        serde_json::Value::String(raw) => req.body(raw.clone()),
        body if request.is_json() => req.body(body.to_string()),
        body => req.form(body),
    }
}

fn wire_version(protocol_version: &str) -> Version {
    match protocol_version {
        "1.0" => Version::HTTP_10,
        _ => Version::HTTP_11,
    }
}

fn version_string(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// The error text followed by each of its causes, separated with `: `.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
