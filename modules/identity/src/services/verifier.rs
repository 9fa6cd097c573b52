use crate::entities::user_account::Role;
use async_trait::async_trait;
use compact_str::CompactString;
use std::collections::HashMap;

/// Verified caller identity, resolved once per request by the gateway's
/// authentication middleware and carried in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub email: CompactString,
    pub role: Role,
}

impl Caller {
    pub fn new(email: impl Into<CompactString>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// External auth collaborator: turns a bearer token into a verified email.
///
/// Role resolution happens separately against the user directory, so an
/// implementation only has to prove who the caller is.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<CompactString, framework::Error>;
}

/// Token-map verifier for development and tests. Unknown tokens fail with
/// [`framework::Error::Unauthorized`].
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<CompactString, CompactString>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<CompactString, CompactString>) -> Self {
        Self { tokens }
    }

    pub fn with_token(
        mut self,
        token: impl Into<CompactString>,
        email: impl Into<CompactString>,
    ) -> Self {
        self.tokens.insert(token.into(), email.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<CompactString, framework::Error> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(framework::Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let verifier = StaticTokenVerifier::default().with_token("tok-1", "alice@example.com");
        assert!(matches!(
            verifier.verify("tok-2").await,
            Err(framework::Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn known_token_yields_the_mapped_email() -> Result<(), framework::Error> {
        let verifier = StaticTokenVerifier::default().with_token("tok-1", "alice@example.com");
        let email = verifier.verify("tok-1").await?;
        assert_eq!(email, "alice@example.com");
        Ok(())
    }
}
