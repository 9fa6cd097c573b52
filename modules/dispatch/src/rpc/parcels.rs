use super::DispatchState;
use crate::entities::{DeliveryStatus, Parcel};
use crate::services::parcel_flow::{
    AssignRider, AssignRiderOutcome, CreateParcel, CreateParcelOutcome, DeleteParcel, GetParcel,
    NewParcel, UpdateParcelStatus, UpdateParcelStatusOutcome,
};
use crate::services::queries::{ListParcels, ListParcelsForRider};
use crate::storage::ParcelFilter;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use framework::Processor;
use identity::rpc::{parse_uuid, require_caller, ApiError};
use identity::services::verifier::Caller;

pub(crate) fn routes() -> Router<DispatchState> {
    Router::new()
        .route("/parcels", post(create_parcel).get(list_parcels))
        // Static segment, so it must not fall into the `:id` matcher.
        .route("/parcels/rider", get(rider_parcels))
        .route("/parcels/:id", get(get_parcel).delete(delete_parcel))
        .route("/parcels/:id/rider", patch(assign_rider))
        .route("/parcels/:id/status", patch(update_status))
}

async fn create_parcel(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Json(body): Json<NewParcel>,
) -> Result<Json<CreateParcelOutcome>, ApiError> {
    let caller = require_caller(caller)?;
    let outcome = state
        .parcel_flow
        .process(CreateParcel {
            caller,
            details: body,
        })
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParcelsQuery {
    sender_email: Option<String>,
    delivery_status: Option<String>,
}

async fn list_parcels(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Query(query): Query<ListParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, ApiError> {
    let caller = require_caller(caller)?;
    let delivery_status = query
        .delivery_status
        .as_deref()
        .map(str::parse::<DeliveryStatus>)
        .transpose()?;
    let parcels = state
        .queries
        .process(ListParcels {
            caller,
            filter: ParcelFilter {
                sender_email: query.sender_email,
                delivery_status,
            },
        })
        .await?;
    Ok(Json(parcels))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RiderParcelsQuery {
    rider_email: String,
    exclude_delivered: Option<bool>,
}

async fn rider_parcels(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Query(query): Query<RiderParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, ApiError> {
    let caller = require_caller(caller)?;
    let parcels = state
        .queries
        .process(ListParcelsForRider {
            caller,
            rider_email: query.rider_email,
            exclude_delivered: query.exclude_delivered.unwrap_or(true),
        })
        .await?;
    Ok(Json(parcels))
}

async fn get_parcel(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, ApiError> {
    require_caller(caller)?;
    let parcel = state
        .parcel_flow
        .process(GetParcel {
            parcel_id: parse_uuid(&id)?,
        })
        .await?;
    Ok(Json(parcel))
}

#[derive(Debug, serde::Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn delete_parcel(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let caller = require_caller(caller)?;
    state
        .parcel_flow
        .process(DeleteParcel {
            caller,
            parcel_id: parse_uuid(&id)?,
        })
        .await?;
    Ok(Json(DeleteResponse { deleted: true }))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignRiderRequest {
    rider_id: String,
}

async fn assign_rider(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<String>,
    Json(body): Json<AssignRiderRequest>,
) -> Result<Json<AssignRiderOutcome>, ApiError> {
    let caller = require_caller(caller)?;
    let outcome = state
        .parcel_flow
        .process(AssignRider {
            caller,
            parcel_id: parse_uuid(&id)?,
            rider_id: parse_uuid(&body.rider_id)?,
        })
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    new_status: String,
    rider_id: Option<String>,
}

async fn update_status(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateParcelStatusOutcome>, ApiError> {
    require_caller(caller)?;
    let rider_id = body.rider_id.as_deref().map(parse_uuid).transpose()?;
    let outcome = state
        .parcel_flow
        .process(UpdateParcelStatus {
            parcel_id: parse_uuid(&id)?,
            new_status: body.new_status.parse::<DeliveryStatus>()?,
            rider_id,
        })
        .await?;
    Ok(Json(outcome))
}
