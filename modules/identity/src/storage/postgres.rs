use super::UserStore;
use crate::entities::user_account::{Role, UserAccount};
use async_trait::async_trait;
use framework::sqlx::Database;
use time::PrimitiveDateTime;
use tracing::instrument;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, display_name, role, created_at, last_login_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: Database,
}

impl PgUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip_all, name = "SQL:InsertUserAccount", err)]
    async fn insert(&self, user: UserAccount) -> Result<(), framework::Error> {
        sqlx::query(
            r#"
            INSERT INTO "accounts"."user_account"
                (id, email, display_name, role, created_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.last_login_at)
        .execute(self.db.db())
        .await?;
        Ok(())
    }

    #[instrument(skip_all, name = "SQL:FindUserAccountByEmail", err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, framework::Error> {
        let user = sqlx::query_as::<_, UserAccount>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "accounts"."user_account" WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(self.db.db())
        .await?;
        Ok(user)
    }

    #[instrument(skip_all, name = "SQL:TouchUserLogin", err)]
    async fn touch_login(
        &self,
        id: Uuid,
        display_name: Option<String>,
        at: PrimitiveDateTime,
    ) -> Result<UserAccount, framework::Error> {
        let user = sqlx::query_as::<_, UserAccount>(&format!(
            r#"
            UPDATE "accounts"."user_account"
            SET last_login_at = $2, display_name = COALESCE($3, display_name)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .bind(display_name)
        .fetch_one(self.db.db())
        .await?;
        Ok(user)
    }

    #[instrument(skip_all, name = "SQL:SetUserRole", err)]
    async fn set_role(&self, id: Uuid, role: Role) -> Result<UserAccount, framework::Error> {
        let user = sqlx::query_as::<_, UserAccount>(&format!(
            r#"
            UPDATE "accounts"."user_account"
            SET role = $2
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role)
        .fetch_one(self.db.db())
        .await?;
        Ok(user)
    }

    #[instrument(skip_all, name = "SQL:SearchUserAccounts", err)]
    async fn search(&self, text: &str) -> Result<Vec<UserAccount>, framework::Error> {
        let pattern = format!("%{text}%");
        let users = sqlx::query_as::<_, UserAccount>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM "accounts"."user_account"
            WHERE email ILIKE $1 OR display_name ILIKE $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(pattern)
        .fetch_all(self.db.db())
        .await?;
        Ok(users)
    }
}
