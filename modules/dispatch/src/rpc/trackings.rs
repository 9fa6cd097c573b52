use super::DispatchState;
use crate::entities::TrackingEvent;
use crate::services::tracking_ledger::ReadTrackingHistory;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use framework::Processor;
use identity::rpc::ApiError;

pub(crate) fn routes() -> Router<DispatchState> {
    Router::new().route("/trackings/:tracking_id/logs", get(tracking_logs))
}

/// No account required: holding a tracking id is what authorizes
/// following that parcel.
async fn tracking_logs(
    State(state): State<DispatchState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Vec<TrackingEvent>>, ApiError> {
    let events = state
        .ledger
        .process(ReadTrackingHistory { tracking_id })
        .await?;
    Ok(Json(events))
}
