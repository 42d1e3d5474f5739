use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::HttpError;
use crate::mock::pattern::MockPattern;
use crate::mock::source::{ResponseFn, ResponseSource};
use crate::net::Transport;
use crate::request::{Method, Request};
use crate::response::Response;

struct MockEntry {
    pattern: MockPattern,
    source: ResponseSource,
}

#[derive(Default)]
struct MockState {
    entries: Vec<MockEntry>,
    history: Vec<Request>,
}

/// The registered mock that answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockMatch {
    /// Position in registration order.
    pub index: usize,
    pub score: u32,
}

/// Transport answering from registered mocks. Never touches the network.
///
/// Shared between clients through an `Arc`. Registration and dispatch take
/// `&self`.
#[derive(Default)]
pub struct MockHandler {
    state: Mutex<MockState>,
}

enum Resolved {
    Ready(Response),
    Deferred(Arc<ResponseFn>),
}

impl MockHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a mock from a `"<url>"` or `"<METHOD> <url>"` pattern.
    pub fn add_mock_request(&self, pattern: &str, source: impl Into<ResponseSource>) -> Result<&Self, HttpError> {
        let pattern = MockPattern::parse(pattern)?;
        Ok(self.add_mock(pattern, source))
    }

    pub fn add_mock(&self, pattern: MockPattern, source: impl Into<ResponseSource>) -> &Self {
        log::debug!("Mock: registered {}", pattern);
        self.state().entries.push(MockEntry {
            pattern,
            source: source.into(),
        });
        self
    }

    /// Registers a fixed response for `method` on `uri`.
    pub fn add_mock_response(&self, uri: &str, response: Response, method: Method) -> Result<&Self, HttpError> {
        let pattern = MockPattern::new(method, uri)?;
        Ok(self.add_mock(pattern, response))
    }

    /// Registers several mocks at once. Nothing is registered when one of
    /// the patterns is malformed.
    pub fn mock_multi<I, P, S>(&self, mocks: I) -> Result<&Self, HttpError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<str>,
        S: Into<ResponseSource>,
    {
        let entries = mocks
            .into_iter()
            .map(|(pattern, source)| {
                Ok(MockEntry {
                    pattern: MockPattern::parse(pattern.as_ref())?,
                    source: source.into(),
                })
            })
            .collect::<Result<Vec<_>, HttpError>>()?;

        self.state().entries.extend(entries);
        Ok(self)
    }

    /// Finds the mock that would answer `request`.
    pub fn best_match(&self, request: &Request) -> Option<MockMatch> {
        best_match(&self.state().entries, request)
    }

    /// Every request answered so far, oldest first, each with its response attached.
    pub fn history(&self) -> Vec<Request> {
        self.state().history.clone()
    }

    /// Removes all mocks and forgets the history.
    pub fn reset(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.history.clear();
    }

    pub fn mock_count(&self) -> usize {
        self.state().entries.len()
    }
}

impl fmt::Debug for MockHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MockHandler")
            .field("mocks", &state.entries.len())
            .field("history", &state.history.len())
            .finish()
    }
}

impl Transport for MockHandler {
    fn send(&self, request: &Request) -> Response {
        let resolved = {
            let mut state = self.state();
            let found = best_match(&state.entries, request);
            match found {
                None => {
                    log::debug!("Mock: no match for {} {}", request.method(), request.url());
                    Resolved::Ready(Response::not_found())
                }
                Some(found) => {
                    let entry = &mut state.entries[found.index];
                    log::debug!(
                        "Mock: {} {} matched {} (score {})",
                        request.method(),
                        request.url(),
                        entry.pattern,
                        found.score
                    );
                    match &mut entry.source {
                        ResponseSource::Fixed(response) => Resolved::Ready(response.clone()),
                        ResponseSource::Sequence(sequence) => Resolved::Ready(sequence.take().unwrap_or_else(|| {
                            log::debug!("Mock: sequence for {} is exhausted", entry.pattern);
                            Response::not_found()
                        })),
                        ResponseSource::Computed(f) => Resolved::Deferred(f.clone()),
                    }
                }
            }
        };

        // Computed responses run without holding the lock, they may call back into the handler
        let mut response = match resolved {
            Resolved::Ready(response) => response,
            Resolved::Deferred(f) => f(request),
        };
        response.set_request(request.clone());

        let mut recorded = request.clone();
        recorded.set_response(response.clone());
        self.state().history.push(recorded);

        response
    }
}

/// Highest score wins; on a tie the earliest registration stays.
fn best_match(entries: &[MockEntry], request: &Request) -> Option<MockMatch> {
    let mut best: Option<MockMatch> = None;
    for (index, entry) in entries.iter().enumerate() {
        let Some(score) = entry.pattern.score(request) else {
            log::trace!("Mock: {} rejected {}", entry.pattern, request.url());
            continue;
        };
        if best.map_or(true, |b| score > b.score) {
            best = Some(MockMatch { index, score });
        }
    }
    best
}
