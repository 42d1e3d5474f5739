//! Shared HTTP message model: headers, protocol version and status lines.
//!
//! Both [`Request`](crate::Request) and [`Response`](crate::Response) implement
//! [`HttpMessage`], which provides the header accessors on top of a
//! [`HeaderBag`].
mod headers;
mod status;

pub use headers::HeaderBag;
pub use status::{matches_class, reason_phrase, StatusLine};

pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

/// Header and protocol accessors shared by requests and responses.
///
/// Setters return `&mut Self` so calls can be chained.
pub trait HttpMessage {
    fn headers(&self) -> &HeaderBag;

    fn headers_mut(&mut self) -> &mut HeaderBag;

    fn protocol_version(&self) -> &str;

    fn set_protocol_version(&mut self, version: impl Into<String>) -> &mut Self
    where
        Self: Sized;

    /// All values of a header joined with `,`, or an empty string.
    fn header(&self, name: &str) -> String {
        self.headers().get(name)
    }

    fn header_lines(&self, name: &str) -> &[String] {
        self.headers().get_lines(name)
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.headers_mut().set(name, value);
        self
    }

    /// Replaces all values of a header. An empty list removes it.
    fn set_header_lines<I, V>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        Self: Sized,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.headers_mut().set_lines(name, values);
        self
    }

    fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.headers_mut().add(name, value);
        self
    }

    fn remove_header(&mut self, name: &str) -> &mut Self
    where
        Self: Sized,
    {
        self.headers_mut().remove(name);
        self
    }

    /// Replaces every header of the message.
    fn set_headers(&mut self, headers: impl Into<HeaderBag>) -> &mut Self
    where
        Self: Sized,
    {
        *self.headers_mut() = headers.into();
        self
    }
}
