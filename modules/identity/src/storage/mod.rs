use crate::entities::user_account::{Role, UserAccount};
use async_trait::async_trait;
use time::PrimitiveDateTime;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Per-collection handle for user accounts.
///
/// Implementations only promise single-document atomicity; `insert` must
/// reject a duplicate email with [`framework::Error::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn insert(&self, user: UserAccount) -> Result<(), framework::Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, framework::Error>;

    /// Refreshes the login timestamp and, when given, the display name.
    async fn touch_login(
        &self,
        id: Uuid,
        display_name: Option<String>,
        at: PrimitiveDateTime,
    ) -> Result<UserAccount, framework::Error>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<UserAccount, framework::Error>;

    /// Case-insensitive substring match over email and display name,
    /// newest account first. An empty needle matches everyone.
    async fn search(&self, text: &str) -> Result<Vec<UserAccount>, framework::Error>;
}
