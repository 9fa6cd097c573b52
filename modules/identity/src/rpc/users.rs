use crate::entities::user_account::{Role, UserAccount};
use crate::rpc::{ApiError, parse_uuid, require_caller};
use crate::services::directory::{
    GetUserRole, RecordLogin, SearchUsers, SetUserRole, UserDirectoryService,
};
use crate::services::verifier::Caller;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use framework::Processor;

#[derive(Clone)]
pub struct IdentityState {
    pub directory: UserDirectoryService,
}

pub fn router(state: IdentityState) -> Router {
    Router::new()
        .route("/users", post(record_login).get(search_users))
        // GET keys by email, PATCH keys by account id.
        .route("/users/:key/role", get(user_role).patch(set_user_role))
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordLoginRequest {
    email: String,
    display_name: Option<String>,
}

async fn record_login(
    State(state): State<IdentityState>,
    caller: Option<Extension<Caller>>,
    Json(body): Json<RecordLoginRequest>,
) -> Result<Json<UserAccount>, ApiError> {
    let caller = require_caller(caller)?;
    let account = state
        .directory
        .process(RecordLogin {
            caller,
            email: body.email,
            display_name: body.display_name,
        })
        .await?;
    Ok(Json(account))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchUsersQuery {
    search_text: Option<String>,
}

async fn search_users(
    State(state): State<IdentityState>,
    caller: Option<Extension<Caller>>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<Vec<UserAccount>>, ApiError> {
    let caller = require_caller(caller)?;
    let users = state
        .directory
        .process(SearchUsers {
            caller,
            text: query.search_text.unwrap_or_default(),
        })
        .await?;
    Ok(Json(users))
}

#[derive(Debug, serde::Serialize)]
struct RoleResponse {
    role: Role,
}

async fn user_role(
    State(state): State<IdentityState>,
    caller: Option<Extension<Caller>>,
    Path(key): Path<String>,
) -> Result<Json<RoleResponse>, ApiError> {
    let caller = require_caller(caller)?;
    let role = state
        .directory
        .process(GetUserRole { caller, email: key })
        .await?;
    Ok(Json(RoleResponse { role }))
}

#[derive(Debug, serde::Deserialize)]
struct SetRoleRequest {
    role: Role,
}

async fn set_user_role(
    State(state): State<IdentityState>,
    caller: Option<Extension<Caller>>,
    Path(key): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<UserAccount>, ApiError> {
    let caller = require_caller(caller)?;
    let user_id = parse_uuid(&key)?;
    let account = state
        .directory
        .process(SetUserRole {
            caller,
            user_id,
            role: body.role,
        })
        .await?;
    Ok(Json(account))
}
