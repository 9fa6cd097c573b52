use super::DispatchState;
use crate::entities::{ApprovalStatus, Rider, WorkStatus};
use crate::services::queries::ListRiders;
use crate::services::rider_registry::{
    CreateRiderApplication, NewRider, ReviewDecision, ReviewRiderApplication,
};
use crate::storage::RiderFilter;
use axum::extract::{Path, Query, State};
use axum::routing::{patch, post};
use axum::{Extension, Json, Router};
use framework::Processor;
use identity::rpc::{parse_uuid, require_caller, ApiError};
use identity::services::verifier::Caller;

pub(crate) fn routes() -> Router<DispatchState> {
    Router::new()
        .route("/riders", post(create_rider).get(list_riders))
        .route("/riders/:id/status", patch(review_rider))
}

async fn create_rider(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Json(body): Json<NewRider>,
) -> Result<Json<Rider>, ApiError> {
    let caller = require_caller(caller)?;
    let rider = state
        .registry
        .process(CreateRiderApplication {
            caller,
            details: body,
        })
        .await?;
    Ok(Json(rider))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RiderListQuery {
    status: Option<ApprovalStatus>,
    district: Option<String>,
    work_status: Option<WorkStatus>,
}

async fn list_riders(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Query(query): Query<RiderListQuery>,
) -> Result<Json<Vec<Rider>>, ApiError> {
    let caller = require_caller(caller)?;
    let riders = state
        .queries
        .process(ListRiders {
            caller,
            filter: RiderFilter {
                status: query.status,
                district: query.district,
                work_status: query.work_status,
            },
        })
        .await?;
    Ok(Json(riders))
}

#[derive(Debug, serde::Deserialize)]
struct ReviewRequest {
    decision: ReviewDecision,
}

async fn review_rider(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Rider>, ApiError> {
    let caller = require_caller(caller)?;
    let rider = state
        .registry
        .process(ReviewRiderApplication {
            caller,
            rider_id: parse_uuid(&id)?,
            decision: body.decision,
        })
        .await?;
    Ok(Json(rider))
}
