//! Status lines, reason phrases and status classes.
//!
//! Accepted status forms:
//! - `HTTP/<version> <3-digit code> <reason phrase>`
//! - `<3-digit code> <reason phrase>`
//! - `<3-digit code>`

/// A parsed status line. Every part except the code is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub protocol_version: Option<String>,
    pub code: u16,
    pub reason: Option<String>,
}

impl StatusLine {
    pub fn parse(input: &str) -> Option<Self> {
        let mut rest = input.trim();
        let mut protocol_version = None;

        if starts_with_ignore_case(rest, "HTTP/") {
            let after = &rest[5..];
            let end = after
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(after.len());
            if end == 0 {
                return None;
            }
            let remainder = &after[end..];
            if !remainder.starts_with(char::is_whitespace) {
                return None;
            }
            protocol_version = Some(after[..end].to_string());
            rest = remainder.trim_start();
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits != 3 {
            return None;
        }
        let code = rest[..3].parse().ok()?;
        let reason = rest[3..].trim();

        Some(StatusLine {
            protocol_version,
            code,
            reason: (!reason.is_empty()).then(|| reason.to_string()),
        })
    }

    /// True for lines that open a response block (`HTTP/x.y nnn ...`).
    pub fn is_status_line(line: &str) -> bool {
        matches!(Self::parse(line), Some(StatusLine { protocol_version: Some(_), .. }))
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Standard reason phrase for `code`, if one is known.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    let phrase = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "(Unused)",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        // Anything else falls back on the registry known to the http crate
        _ => return http::StatusCode::from_u16(code).ok()?.canonical_reason(),
    };
    Some(phrase)
}

/// Checks `code` against a status class such as `"2xx"` or `"30x"`.
///
/// `x` (either case) matches a single digit. The class must be as long as
/// the code's decimal form.
pub fn matches_class(code: u16, class: &str) -> bool {
    let code = code.to_string();
    code.len() == class.len()
        && code
            .bytes()
            .zip(class.bytes())
            .all(|(digit, pat)| matches!(pat, b'x' | b'X') || pat == digit)
}
