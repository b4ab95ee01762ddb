//! Client configuration.

/// Backend base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable overriding the base URL.
pub const API_URL_ENV: &str = "STEPWISE_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash, e.g. `http://localhost:5000/api`.
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Default config with `STEPWISE_API_URL` applied when set and non-empty.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(Self::default, |v| Self::new(v.trim()))
    }

    /// Absolute URL for `path` (given without a leading slash).
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let cfg = ClientConfig::new("http://example.test/api//");
        assert_eq!(cfg.url("trace/unified"), "http://example.test/api/trace/unified");
        assert_eq!(cfg.url("/algorithms"), "http://example.test/api/algorithms");
    }

    #[test]
    fn default_points_at_local_backend() {
        assert_eq!(ClientConfig::default().base_url, DEFAULT_API_URL);
    }
}
