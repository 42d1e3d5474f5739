use std::collections::BTreeMap;

use serde::Deserialize;

use crate::request::RequestOptions;

pub const DEFAULT_USER_AGENT: &str = concat!("GosubHttp/", env!("CARGO_PKG_VERSION"));

/// Client configuration. Deserializes from camelCase keys; missing keys take
/// their default and unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Prefix for every relative URI
    pub base_url: String,
    /// User agent string for HTTP requests. Empty means no User-Agent header.
    pub user_agent: String,
    /// Headers sent with every request. Override the user agent when they name it.
    pub default_headers: BTreeMap<String, String>,
    /// Options for every request, below the per-call options
    pub default_options: RequestOptions,
    /// Turn non-2xx responses into errors
    pub throw_exceptions: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: BTreeMap::new(),
            default_options: RequestOptions::default(),
            throw_exceptions: false,
        }
    }
}
