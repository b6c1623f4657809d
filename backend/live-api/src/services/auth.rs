use async_trait::async_trait;

use crate::models::error::GameError;

/// A transport caller after authentication. The engine never sees
/// tokens, only resolved identities.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub is_host: bool,
}

/// Resolves a raw transport credential to a caller identity before any
/// session operation runs.
#[async_trait]
pub trait CallerAuthorizer: Send + Sync {
    async fn authorize(&self, session_id: &str, token: &str) -> Result<CallerIdentity, GameError>;
}

/// Token scheme for the standalone binary and tests: the token is the
/// caller's user id, with an optional `:host` suffix marking the host
/// role. Real deployments supply their own resolver.
pub struct StaticTokenAuthorizer;

#[async_trait]
impl CallerAuthorizer for StaticTokenAuthorizer {
    async fn authorize(&self, _session_id: &str, token: &str) -> Result<CallerIdentity, GameError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GameError::Unauthorized("missing token".to_string()));
        }

        match token.split_once(':') {
            Some((user_id, "host")) if !user_id.is_empty() => Ok(CallerIdentity {
                user_id: user_id.to_string(),
                is_host: true,
            }),
            Some(_) => Err(GameError::Unauthorized("malformed token".to_string())),
            None => Ok(CallerIdentity {
                user_id: token.to_string(),
                is_host: false,
            }),
        }
    }
}
