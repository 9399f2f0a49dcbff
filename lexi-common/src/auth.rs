//! Authentication context for CMS calls
//!
//! The CMS token and the acting user's identifier are resolved once, when a
//! wizard is created, and handed to it explicitly. Nothing downstream reads
//! them from process-wide state.

use serde::{Deserialize, Serialize};

/// Environment variable holding the fallback CMS bearer token
pub const TOKEN_ENV: &str = "LEXI_CMS_TOKEN";

/// Environment variable holding the fallback CMS user identifier
pub const USER_ID_ENV: &str = "LEXI_USER_ID";

/// Credentials used for write operations against the CMS
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Bearer token (JWT issued by the CMS)
    pub token: Option<String>,
    /// CMS user identifier, recorded as the author of audit entries
    pub user_id: Option<u64>,
}

impl AuthContext {
    pub fn new(token: Option<String>, user_id: Option<u64>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            user_id,
        }
    }

    /// Anonymous context (read-only access)
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build context from `LEXI_CMS_TOKEN` / `LEXI_USER_ID`
    pub fn from_env() -> Self {
        let token = std::env::var(TOKEN_ENV).ok();
        let user_id = std::env::var(USER_ID_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok());
        Self::new(token, user_id)
    }

    /// Fill missing fields from another context (e.g. request headers over ENV)
    pub fn or(self, fallback: AuthContext) -> Self {
        Self {
            token: self.token.or(fallback.token),
            user_id: self.user_id.or(fallback.user_id),
        }
    }

    /// Bearer token, if one is available
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

// Never print the token itself
impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_dropped() {
        let ctx = AuthContext::new(Some("   ".to_string()), Some(3));
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.user_id, Some(3));
    }

    #[test]
    fn test_or_prefers_self() {
        let primary = AuthContext::new(Some("abc".to_string()), None);
        let fallback = AuthContext::new(Some("zzz".to_string()), Some(9));
        let merged = primary.or(fallback);
        assert_eq!(merged.bearer(), Some("abc"));
        assert_eq!(merged.user_id, Some(9));
    }

    #[test]
    fn test_debug_redacts_token() {
        let ctx = AuthContext::new(Some("secret-token".to_string()), Some(1));
        let printed = format!("{:?}", ctx);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }
}
