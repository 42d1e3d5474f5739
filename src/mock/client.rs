use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::client::HttpClient;
use crate::errors::HttpError;
use crate::mock::handler::MockHandler;
use crate::mock::source::ResponseSource;
use crate::request::Method;
use crate::response::Response;

/// An [`HttpClient`] wired to its own [`MockHandler`].
///
/// Derefs to the client, so all request methods are available directly.
#[derive(Debug)]
pub struct MockHttpClient {
    client: HttpClient,
    handler: Arc<MockHandler>,
}

impl MockHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let handler = Arc::new(MockHandler::new());
        let client = HttpClient::new(base_url, handler.clone());
        Self { client, handler }
    }

    pub fn handler(&self) -> &Arc<MockHandler> {
        &self.handler
    }

    pub fn add_mock_request(&self, pattern: &str, source: impl Into<ResponseSource>) -> Result<&Self, HttpError> {
        self.handler.add_mock_request(pattern, source)?;
        Ok(self)
    }

    pub fn add_mock_response(&self, uri: &str, response: Response, method: Method) -> Result<&Self, HttpError> {
        self.handler.add_mock_response(uri, response, method)?;
        Ok(self)
    }

    pub fn mock_multi<I, P, S>(&self, mocks: I) -> Result<&Self, HttpError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<str>,
        S: Into<ResponseSource>,
    {
        self.handler.mock_multi(mocks)?;
        Ok(self)
    }

    pub fn into_inner(self) -> HttpClient {
        self.client
    }
}

impl Deref for MockHttpClient {
    type Target = HttpClient;

    fn deref(&self) -> &HttpClient {
        &self.client
    }
}

impl DerefMut for MockHttpClient {
    fn deref_mut(&mut self) -> &mut HttpClient {
        &mut self.client
    }
}
