use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::errors::HttpError;
use crate::request::{Method, Request, RequestTarget};

/// Points for a host or path that matches exactly.
const EXACT_SCORE: u32 = 2;
/// Points for a host or path that matches through a `*` wildcard.
const WILDCARD_SCORE: u32 = 1;

/// What a mocked request must look like.
///
/// Host and path may contain `*` wildcards. A pattern without a host (a
/// relative URL) accepts any host, and a pattern without a path accepts any
/// path. Query parameters and body fields on the pattern must all be present
/// on the incoming request; extra ones on the request are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct MockPattern {
    method: Method,
    host: Component,
    path: Component,
    query: BTreeMap<String, String>,
    body: Value,
}

/// Host or path of a pattern.
#[derive(Debug, Clone)]
enum Component {
    Any,
    Exact(String),
    Wildcard { source: String, regex: Regex },
}

impl Component {
    fn new(text: Option<String>) -> Result<Self, HttpError> {
        let Some(text) = text else {
            return Ok(Component::Any);
        };
        if !text.contains('*') {
            return Ok(Component::Exact(text));
        }

        // `*` matches any run of characters, including `/` and `.`
        let body = text.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|e| HttpError::InvalidMockPattern(format!("\"{text}\": {e}")))?;
        Ok(Component::Wildcard { source: text, regex })
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Component::Any => None,
            Component::Exact(text) | Component::Wildcard { source: text, .. } => Some(text.as_str()),
        }
    }

    fn score(&self, actual: &str) -> Option<u32> {
        match self {
            Component::Any => Some(0),
            Component::Exact(text) => (text == actual).then_some(EXACT_SCORE),
            Component::Wildcard { regex, .. } => regex.is_match(actual).then_some(WILDCARD_SCORE),
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Component::Any, Component::Any)
                | (Component::Exact(_), Component::Exact(_))
                | (Component::Wildcard { .. }, Component::Wildcard { .. })
        ) && self.as_str() == other.as_str()
    }
}

impl MockPattern {
    /// Builds a pattern for `method` and a URL that may contain wildcards.
    /// A URL of `*` matches every host and path.
    ///
    /// Paths without wildcards are normalized the way request URLs are, so
    /// `/a/../x` and `/x` are the same pattern.
    pub fn new(method: Method, url: &str) -> Result<Self, HttpError> {
        let url = url.trim();
        if url == "*" {
            return Ok(Self {
                method,
                host: Component::new(Some("*".to_string()))?,
                path: Component::Any,
                query: BTreeMap::new(),
                body: Value::Null,
            });
        }

        let parts = PatternParts::split(url);
        let path = match parts.path {
            Some(path) if !path.contains('*') => Some(normalize_path(path, url)?),
            path => path.map(str::to_string),
        };
        let query = url::form_urlencoded::parse(parts.query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

        Ok(Self {
            method,
            host: Component::new(parts.host.map(str::to_ascii_lowercase))?,
            path: Component::new(path)?,
            query,
            body: Value::Null,
        })
    }

    /// Parses `"<url>"` (a GET) or `"<METHOD> <url>"`.
    pub fn parse(pattern: &str) -> Result<Self, HttpError> {
        let trimmed = pattern.trim();
        let (method, url) = match trimmed.split_once(char::is_whitespace) {
            Some((method, url)) => {
                let method = method
                    .parse::<Method>()
                    .map_err(|_| HttpError::InvalidMockPattern(format!("unknown method in \"{pattern}\"")))?;
                (method, url.trim())
            }
            None => (Method::Get, trimmed),
        };

        if url.is_empty() {
            return Err(HttpError::InvalidMockPattern(format!("no url in \"{pattern}\"")));
        }
        if url.contains(char::is_whitespace) {
            return Err(HttpError::InvalidMockPattern(format!("unexpected whitespace in \"{pattern}\"")));
        }

        Self::new(method, url)
    }

    /// Uses a request as the pattern, including its body.
    pub fn from_request(request: &Request) -> Result<Self, HttpError> {
        Ok(Self::new(request.method(), request.url())?.with_body(request.body().clone()))
    }

    /// Fields a structured request body must contain. Only objects are compared.
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_str()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_str()
    }

    /// Scores how specifically this pattern matches `request`, or `None`
    /// when it does not match at all.
    ///
    /// An exact host or path is worth 2, a wildcard one 1 and an absent one 0.
    /// Every matched query parameter and body field is worth 1. Requests whose
    /// URL does not parse never match.
    pub fn score(&self, request: &Request) -> Option<u32> {
        if request.method() != self.method {
            return None;
        }

        let target = request.target().ok()?;
        let mut score = self.host.score(target.host().unwrap_or_default())?;
        score += self.path.score(target.path())?;

        if !self.query.is_empty() {
            let query = target.query();
            for (name, expected) in &self.query {
                if query.get(name) != Some(expected) {
                    return None;
                }
                score += 1;
            }
        }

        if let (Value::Object(own), Value::Object(incoming)) = (&self.body, request.body()) {
            for (name, expected) in own {
                match incoming.get(name) {
                    Some(actual) if loosely_equal(expected, actual) => score += 1,
                    _ => return None,
                }
            }
        }

        Some(score)
    }
}

impl TryFrom<&Request> for MockPattern {
    type Error = HttpError;

    fn try_from(request: &Request) -> Result<Self, HttpError> {
        MockPattern::from_request(request)
    }
}

impl fmt::Display for MockPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.method)?;
        if let Some(host) = self.host() {
            write!(f, "//{host}")?;
        }
        write!(f, "{}", self.path().unwrap_or(""))?;
        for (i, (name, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

/// Pieces of a pattern URL. Patterns may carry `*` in places a URL parser
/// rejects, so they are split by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PatternParts<'a> {
    host: Option<&'a str>,
    path: Option<&'a str>,
    query: Option<&'a str>,
}

impl<'a> PatternParts<'a> {
    fn split(url: &'a str) -> Self {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        let (before_query, query) = match url.split_once('?') {
            Some((before, query)) => (before, Some(query)),
            None => (url, None),
        };

        let after_scheme = match before_query.find("://") {
            Some(idx) => Some(&before_query[idx + 3..]),
            None => before_query.strip_prefix("//"),
        };

        let (host, path) = match after_scheme {
            Some(rest) => {
                let (authority, path) = match rest.find('/') {
                    Some(idx) => (&rest[..idx], &rest[idx..]),
                    None => (rest, ""),
                };
                (Some(host_of(authority)), path)
            }
            None => (None, before_query),
        };

        PatternParts {
            host: host.filter(|h| !h.is_empty()),
            path: (!path.is_empty()).then_some(path),
            query: query.filter(|q| !q.is_empty()),
        }
    }
}

/// Strips userinfo and port from an authority.
fn host_of(authority: &str) -> &str {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    if host_port.starts_with('[') {
        // IPv6 literal, keep the brackets
        return match host_port.find(']') {
            Some(end) => &host_port[..=end],
            None => host_port,
        };
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => host_port,
    }
}

/// Runs a literal pattern path through the same URL parser as requests.
fn normalize_path(path: &str, pattern: &str) -> Result<String, HttpError> {
    RequestTarget::parse(path)
        .map(|target| target.path().to_string())
        .map_err(|e| HttpError::InvalidMockPattern(format!("\"{pattern}\": {e}")))
}

/// Scalars compare by their text, so `"1"` equals `1`.
fn loosely_equal(expected: &Value, actual: &Value) -> bool {
    fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    if expected == actual {
        return true;
    }
    match (scalar_text(expected), scalar_text(actual)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get(url: &str) -> Request {
        Request::new(Method::Get, url)
    }

    #[test]
    fn parses_method_and_url() {
        let pattern = MockPattern::parse("post https://API.example.com/users?active=1").unwrap();
        assert_eq!(pattern.method(), Method::Post);
        assert_eq!(pattern.host(), Some("api.example.com"));
        assert_eq!(pattern.path(), Some("/users"));
        assert_eq!(pattern.to_string(), "POST //api.example.com/users?active=1");

        let pattern = MockPattern::parse("/users").unwrap();
        assert_eq!(pattern.method(), Method::Get);
        assert_eq!(pattern.host(), None);
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(matches!(MockPattern::parse(""), Err(HttpError::InvalidMockPattern(_))));
        assert!(matches!(MockPattern::parse("FETCH /x"), Err(HttpError::InvalidMockPattern(_))));
        assert!(matches!(MockPattern::parse("GET /a /b"), Err(HttpError::InvalidMockPattern(_))));
    }

    #[test]
    fn method_must_match() {
        let pattern = MockPattern::parse("DELETE /x").unwrap();
        assert_eq!(pattern.score(&get("/x")), None);
        assert_eq!(pattern.score(&Request::new(Method::Delete, "/x")), Some(2));
    }

    #[test]
    fn exact_beats_wildcard() {
        let exact = MockPattern::parse("https://example.com/a/b").unwrap();
        let wild_path = MockPattern::parse("https://example.com/a/*").unwrap();
        let wild_host = MockPattern::parse("https://*.com/a/b").unwrap();
        let request = get("https://example.com/a/b");

        assert_eq!(exact.score(&request), Some(4));
        assert_eq!(wild_path.score(&request), Some(3));
        assert_eq!(wild_host.score(&request), Some(3));
        assert_eq!(wild_path.score(&get("https://other.com/a/b")), None);
    }

    #[test]
    fn star_matches_everything() {
        let pattern = MockPattern::parse("*").unwrap();
        assert_eq!(pattern.score(&get("https://example.com/a?b=c")), Some(1));
        assert_eq!(pattern.score(&get("/relative")), Some(1));
        assert_eq!(pattern.score(&Request::new(Method::Post, "/relative")), None);
    }

    #[test]
    fn relative_patterns_accept_any_host() {
        let pattern = MockPattern::parse("/x").unwrap();
        assert_eq!(pattern.score(&get("https://example.com/x")), Some(2));
        assert_eq!(pattern.score(&get("/x")), Some(2));
        assert_eq!(pattern.score(&get("/y")), None);
    }

    #[test]
    fn host_only_pattern_accepts_any_path() {
        let pattern = MockPattern::parse("https://example.com").unwrap();
        assert_eq!(pattern.score(&get("https://example.com/deep/path")), Some(2));
        assert_eq!(pattern.score(&get("https://example.org/")), None);
    }

    #[test]
    fn query_is_a_subset_match() {
        let pattern = MockPattern::parse("/x?q=foo&page=2").unwrap();
        assert_eq!(pattern.score(&get("/x?page=2&q=foo&extra=1")), Some(4));
        assert_eq!(pattern.score(&get("/x?q=foo")), None);
        assert_eq!(pattern.score(&get("/x?q=bar&page=2")), None);
        assert_eq!(pattern.score(&get("/x?q=f%6Fo&page=2")), Some(4));
    }

    #[test]
    fn object_bodies_are_a_subset_match() {
        let pattern = MockPattern::parse("POST /x").unwrap().with_body(json!({"b": "foo", "n": 1}));
        let request = |body: Value| Request::new(Method::Post, "/x").with_body(body);

        assert_eq!(pattern.score(&request(json!({"b": "foo", "n": "1", "other": true}))), Some(4));
        assert_eq!(pattern.score(&request(json!({"b": "bar", "n": 1}))), None);
        assert_eq!(pattern.score(&request(json!({"b": "foo"}))), None);
        // Unstructured bodies are not compared
        assert_eq!(pattern.score(&request(json!("b=foo"))), Some(2));
    }

    #[test]
    fn pattern_from_request_keeps_body() {
        let source = Request::new(Method::Put, "https://example.com/x?id=1").with_body(json!({"a": 1}));
        let pattern = MockPattern::try_from(&source).unwrap();

        assert_eq!(pattern.score(&source), Some(2 + 2 + 1 + 1));
    }

    #[test]
    fn wildcards_match_any_run_of_characters() {
        let score = |pattern: &str, url: &str| MockPattern::parse(pattern).unwrap().score(&get(url));

        assert_eq!(score("/users/*/posts", "/users/1/posts"), Some(1));
        assert_eq!(score("/users/*/posts", "/users/1/2/posts"), Some(1));
        assert_eq!(score("/users/*/posts", "/users/1/comments"), None);
        assert_eq!(score("https://*.example.com", "https://api.example.com/x"), Some(1));
        assert_eq!(score("https://*.example.com", "https://api.exampleXcom/x"), None);
        assert_eq!(score("/a**b", "/ab"), Some(1));
        assert_eq!(score("/a*b", "/ba"), None);
        // Regex metacharacters in the pattern are literal
        assert_eq!(score("/v1.0/(*)", "/v1.0/(x)"), Some(1));
        assert_eq!(score("/v1.0/(*)", "/v1x0/(x)"), None);
    }

    #[test]
    fn paths_are_compared_after_normalization() {
        let pattern = MockPattern::parse("/x").unwrap();
        assert_eq!(pattern.score(&get("https://example.com/a/../x")), Some(2));
        assert_eq!(pattern.score(&get("/./x")), Some(2));

        let pattern = MockPattern::parse("/a/../files/my%20doc").unwrap();
        assert_eq!(pattern.path(), Some("/files/my%20doc"));
        assert_eq!(pattern.score(&get("https://example.com/files/my doc")), Some(2));
    }

    #[test]
    fn hosts_compare_case_insensitively() {
        let pattern = MockPattern::parse("https://Example.COM/x").unwrap();
        assert_eq!(pattern.score(&get("https://EXAMPLE.com:443/x")), Some(4));
    }

    #[test]
    fn unparsable_request_urls_never_match() {
        let pattern = MockPattern::parse("*").unwrap();
        assert_eq!(pattern.score(&get("http://exa mple.com/")), None);
    }

    #[test]
    fn pattern_parts() {
        let parts = PatternParts::split("https://user:pw@Example.com:8443/a/b?q=1&r=2#frag");
        assert_eq!(parts.host, Some("Example.com"));
        assert_eq!(parts.path, Some("/a/b"));
        assert_eq!(parts.query, Some("q=1&r=2"));

        let parts = PatternParts::split("/x?q=foo");
        assert_eq!(parts, PatternParts { host: None, path: Some("/x"), query: Some("q=foo") });

        let parts = PatternParts::split("http://*.example.com");
        assert_eq!(parts, PatternParts { host: Some("*.example.com"), path: None, query: None });

        let parts = PatternParts::split("//[::1]:80/p");
        assert_eq!(parts.host, Some("[::1]"));
        assert_eq!(parts.path, Some("/p"));
    }
}
