use crate::entities::user_account::{Role, UserAccount};
use crate::services::verifier::Caller;
use crate::storage::UserStore;
use crate::utils::rbac;
use framework::Processor;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserDirectoryService {
    pub users: Arc<dyn UserStore>,
}

/// Upsert on login: first sight creates the account with role `user`,
/// later sights refresh the login timestamp and display name.
#[derive(Debug, Clone)]
pub struct RecordLogin {
    pub caller: Caller,
    pub email: String,
    pub display_name: Option<String>,
}

impl Processor<RecordLogin> for UserDirectoryService {
    type Output = UserAccount;
    type Error = framework::Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: RecordLogin) -> Result<UserAccount, framework::Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.email)?;
        if let Some(existing) = self.users.find_by_email(&input.email).await? {
            return self
                .users
                .touch_login(existing.id, input.display_name, framework::now_time())
                .await;
        }
        let now = framework::now_time();
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: input.email.clone(),
            display_name: input.display_name.clone(),
            role: Role::User,
            created_at: now,
            last_login_at: now,
        };
        match self.users.insert(account.clone()).await {
            Ok(()) => Ok(account),
            // Lost a concurrent first-login race; fall through to the
            // refresh path against the winner's row.
            Err(framework::Error::Conflict) => {
                let existing = self
                    .users
                    .find_by_email(&input.email)
                    .await?
                    .ok_or(framework::Error::Conflict)?;
                self.users
                    .touch_login(existing.id, input.display_name, framework::now_time())
                    .await
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchUsers {
    pub caller: Caller,
    pub text: String,
}

impl Processor<SearchUsers> for UserDirectoryService {
    type Output = Vec<UserAccount>;
    type Error = framework::Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: SearchUsers) -> Result<Vec<UserAccount>, framework::Error> {
        rbac::ensure_admin(&input.caller)?;
        self.users.search(&input.text).await
    }
}

#[derive(Debug, Clone)]
pub struct GetUserRole {
    pub caller: Caller,
    pub email: String,
}

impl Processor<GetUserRole> for UserDirectoryService {
    type Output = Role;
    type Error = framework::Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: GetUserRole) -> Result<Role, framework::Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.email)?;
        let role = self
            .users
            .find_by_email(&input.email)
            .await?
            .map(|u| u.role)
            .unwrap_or(Role::User);
        Ok(role)
    }
}

#[derive(Debug, Clone)]
pub struct SetUserRole {
    pub caller: Caller,
    pub user_id: Uuid,
    pub role: Role,
}

impl Processor<SetUserRole> for UserDirectoryService {
    type Output = UserAccount;
    type Error = framework::Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: SetUserRole) -> Result<UserAccount, framework::Error> {
        rbac::ensure_admin(&input.caller)?;
        self.users.set_role(input.user_id, input.role).await
    }
}

/// Internal promotion used by rider approval; callers guard authorization
/// themselves. Creates the account when the email has never logged in.
#[derive(Debug, Clone)]
pub struct PromoteToRider {
    pub email: String,
}

impl Processor<PromoteToRider> for UserDirectoryService {
    type Output = UserAccount;
    type Error = framework::Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: PromoteToRider) -> Result<UserAccount, framework::Error> {
        if let Some(existing) = self.users.find_by_email(&input.email).await? {
            return self.users.set_role(existing.id, Role::Rider).await;
        }
        let now = framework::now_time();
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: input.email.clone(),
            display_name: None,
            role: Role::Rider,
            created_at: now,
            last_login_at: now,
        };
        match self.users.insert(account.clone()).await {
            Ok(()) => Ok(account),
            Err(framework::Error::Conflict) => {
                let existing = self
                    .users
                    .find_by_email(&input.email)
                    .await?
                    .ok_or(framework::Error::Conflict)?;
                self.users.set_role(existing.id, Role::Rider).await
            }
            Err(e) => Err(e),
        }
    }
}
