/// Shared error taxonomy for every module in the workspace.
///
/// Lookup and permission failures are unit variants; anything carrying an
/// underlying cause wraps an [`anyhow::Error`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("invalid input")]
    InvalidInput,
    #[error("unauthorized")]
    Unauthorized,
    #[error("permissions denied")]
    PermissionsDenied,
    #[error("conflict")]
    Conflict,
    #[error("upstream failure: {0}")]
    Upstream(anyhow::Error),
    #[error("deserialize error: {0}")]
    DeserializeError(anyhow::Error),
    #[error("internal error: {0}")]
    BusinessPanic(anyhow::Error),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Error::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict,
            other => Error::BusinessPanic(other.into()),
        }
    }
}
