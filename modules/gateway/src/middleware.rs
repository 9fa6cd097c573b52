use crate::config::Config;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use compact_str::CompactString;
use identity::entities::user_account::Role;
use identity::rpc::ApiError;
use identity::services::verifier::{Caller, IdentityVerifier, StaticTokenVerifier};
use identity::storage::UserStore;
use std::sync::Arc;

/// What authentication needs per request: token verification plus role
/// lookup against the user directory.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub users: Arc<dyn UserStore>,
    bootstrap_admins: Vec<CompactString>,
}

impl AuthState {
    pub fn new(config: &Config, users: Arc<dyn UserStore>) -> Self {
        Self {
            verifier: Arc::new(StaticTokenVerifier::new(config.auth_tokens.clone())),
            users,
            bootstrap_admins: config.bootstrap_admins.clone(),
        }
    }

    /// Bootstrap admins outrank whatever the directory says, so a fresh
    /// deployment has a working admin before any account exists.
    async fn resolve_role(&self, email: &str) -> Result<Role, framework::Error> {
        if self.bootstrap_admins.iter().any(|a| a.as_str() == email) {
            return Ok(Role::Admin);
        }
        let account = self.users.find_by_email(email).await?;
        Ok(account.map(|a| a.role).unwrap_or(Role::User))
    }
}

/// Resolves the bearer token into a [`Caller`] and stores it in request
/// extensions. Requests without a token pass through anonymously; each
/// handler decides whether it needs a caller. A token that is present
/// but unverifiable is rejected here.
pub async fn authenticate(
    State(auth): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return next.run(req).await;
    };

    let email = match auth.verifier.verify(&token).await {
        Ok(email) => email,
        Err(e) => return ApiError(e).into_response(),
    };
    let role = match auth.resolve_role(&email).await {
        Ok(role) => role,
        Err(e) => return ApiError(e).into_response(),
    };

    req.extensions_mut().insert(Caller::new(email, role));
    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use identity::entities::user_account::UserAccount;
    use identity::storage::MemoryUserStore;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_requires_the_scheme_prefix() {
        assert_eq!(
            bearer_token(&headers_with("Bearer tok-1")).as_deref(),
            Some("tok-1")
        );
        assert!(bearer_token(&headers_with("Basic dXNlcg==")).is_none());
        assert!(bearer_token(&headers_with("Bearer ")).is_none());
        assert!(bearer_token(&HeaderMap::new()).is_none());
    }

    fn auth_state(users: Arc<dyn UserStore>, admins: Vec<CompactString>) -> AuthState {
        AuthState {
            verifier: Arc::new(StaticTokenVerifier::default()),
            users,
            bootstrap_admins: admins,
        }
    }

    #[tokio::test]
    async fn unknown_accounts_default_to_the_user_role() -> Result<(), framework::Error> {
        let auth = auth_state(Arc::new(MemoryUserStore::new()), Vec::new());
        assert_eq!(auth.resolve_role("ghost@example.com").await?, Role::User);
        Ok(())
    }

    #[tokio::test]
    async fn stored_role_wins_for_ordinary_accounts() -> Result<(), framework::Error> {
        let users = Arc::new(MemoryUserStore::new());
        let now = framework::now_time();
        users
            .insert(UserAccount {
                id: uuid::Uuid::new_v4(),
                email: "rhea@example.com".to_string(),
                display_name: None,
                role: Role::Rider,
                created_at: now,
                last_login_at: now,
            })
            .await?;
        let auth = auth_state(users, Vec::new());
        assert_eq!(auth.resolve_role("rhea@example.com").await?, Role::Rider);
        Ok(())
    }

    #[tokio::test]
    async fn bootstrap_admins_outrank_the_directory() -> Result<(), framework::Error> {
        let users = Arc::new(MemoryUserStore::new());
        let now = framework::now_time();
        users
            .insert(UserAccount {
                id: uuid::Uuid::new_v4(),
                email: "root@example.com".to_string(),
                display_name: None,
                role: Role::User,
                created_at: now,
                last_login_at: now,
            })
            .await?;
        let auth = auth_state(users, vec![CompactString::new("root@example.com")]);
        assert_eq!(auth.resolve_role("root@example.com").await?, Role::Admin);
        Ok(())
    }
}
