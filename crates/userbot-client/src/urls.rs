//! Userbot API endpoint URLs.

use crate::credentials::Generation;

/// Default userbot API host.
pub const DEFAULT_ENDPOINT: &str = "https://userbot.getcompass.com";

const LEGACY_API_PATH: &str = "api/v3";
const SIGNED_API_PATH: &str = "api/v2";

/// Builds method URLs for a given API base.
#[derive(Debug, Clone)]
pub struct UrlProvider {
    base: String,
}

impl UrlProvider {
    /// Create a provider; `None` selects [`DEFAULT_ENDPOINT`].
    pub fn new(base: Option<String>) -> Self {
        let base = base
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL of `method` (e.g. `user/send`) for the given protocol generation.
    pub fn api_url(&self, generation: Generation, method: &str) -> String {
        let api_path = match generation {
            Generation::Legacy => LEGACY_API_PATH,
            Generation::Signed => SIGNED_API_PATH,
        };

        format!("{}/{}/{}", self.base, api_path, method.trim_start_matches('/'))
    }
}

impl Default for UrlProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let urls = UrlProvider::default();
        assert_eq!(
            urls.api_url(Generation::Legacy, "user/send"),
            "https://userbot.getcompass.com/api/v3/user/send"
        );
        assert_eq!(
            urls.api_url(Generation::Signed, "request/get"),
            "https://userbot.getcompass.com/api/v2/request/get"
        );
    }

    #[test]
    fn test_custom_endpoint_slashes() {
        let urls = UrlProvider::new(Some("http://localhost:8080/".into()));
        assert_eq!(
            urls.api_url(Generation::Legacy, "/group/getList"),
            "http://localhost:8080/api/v3/group/getList"
        );
    }

    #[test]
    fn test_blank_endpoint_falls_back() {
        let urls = UrlProvider::new(Some("  ".into()));
        assert_eq!(urls.base(), DEFAULT_ENDPOINT);
    }
}
