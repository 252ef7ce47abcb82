//! Bearer token lookup for authenticated module actions.

use crate::application::ports::TokenProvider;

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "STAGEHAND_API_TOKEN";

/// Reads the token from `STAGEHAND_API_TOKEN` on every call, so a token
/// exported mid-session is picked up.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvTokenProvider;

impl TokenProvider for EnvTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// A fixed token, or none.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenProvider(pub Option<String>);

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
