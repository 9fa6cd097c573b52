use super::UserStore;
use crate::entities::user_account::{Role, UserAccount};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::PrimitiveDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory user store for tests and database-less deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, UserAccount>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: UserAccount) -> Result<(), framework::Error> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(framework::Error::Conflict);
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, framework::Error> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn touch_login(
        &self,
        id: Uuid,
        display_name: Option<String>,
        at: PrimitiveDateTime,
    ) -> Result<UserAccount, framework::Error> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(framework::Error::NotFound)?;
        user.last_login_at = at;
        if display_name.is_some() {
            user.display_name = display_name;
        }
        Ok(user.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<UserAccount, framework::Error> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(framework::Error::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn search(&self, text: &str) -> Result<Vec<UserAccount>, framework::Error> {
        let needle = text.to_lowercase();
        let users = self.users.read().await;
        let mut hits: Vec<UserAccount> = users
            .values()
            .filter(|u| {
                u.email.to_lowercase().contains(&needle)
                    || u.display_name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hits)
    }
}
