use super::DispatchState;
use crate::entities::PaymentRecord;
use crate::providers::CheckoutSession;
use crate::services::checkout::{ConfirmCheckoutSession, CreateCheckoutIntent, ReconcileOutcome};
use crate::services::queries::ListPayments;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use framework::Processor;
use identity::rpc::{parse_uuid, require_caller, ApiError};
use identity::services::verifier::Caller;
use rust_decimal::Decimal;

pub(crate) fn routes() -> Router<DispatchState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/checkout-session", post(create_checkout_session))
        .route("/payments/confirm", post(confirm_payment))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutIntentRequest {
    parcel_id: String,
    amount: Decimal,
    parcel_name: String,
    sender_email: String,
    tracking_id: String,
}

async fn create_checkout_session(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Json(body): Json<CheckoutIntentRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let caller = require_caller(caller)?;
    let session = state
        .checkout
        .process(CreateCheckoutIntent {
            caller,
            parcel_id: parse_uuid(&body.parcel_id)?,
            amount: body.amount,
            parcel_name: body.parcel_name,
            sender_email: body.sender_email,
            tracking_id: body.tracking_id,
        })
        .await?;
    Ok(Json(session))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmRequest {
    session_id: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmResponse {
    reconciled: bool,
    transaction_id: Option<String>,
    tracking_id: Option<String>,
    message: &'static str,
}

/// Takes no bearer token: the customer lands here from the provider
/// redirect. Only sessions the provider reports as paid cause writes.
async fn confirm_payment(
    State(state): State<DispatchState>,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let outcome = state
        .checkout
        .process(ConfirmCheckoutSession {
            session_id: body.session_id,
        })
        .await?;
    let response = match outcome {
        ReconcileOutcome::Reconciled {
            transaction_id,
            tracking_id,
        } => ConfirmResponse {
            reconciled: true,
            transaction_id: Some(transaction_id),
            tracking_id: Some(tracking_id),
            message: "payment recorded",
        },
        ReconcileOutcome::AlreadyReconciled {
            transaction_id,
            tracking_id,
        } => ConfirmResponse {
            reconciled: true,
            transaction_id: Some(transaction_id),
            tracking_id: Some(tracking_id),
            message: "payment already reconciled",
        },
        ReconcileOutcome::NotSettled => ConfirmResponse {
            reconciled: false,
            transaction_id: None,
            tracking_id: None,
            message: "session not settled",
        },
    };
    Ok(Json(response))
}

#[derive(Debug, serde::Deserialize)]
struct PaymentHistoryQuery {
    email: String,
}

async fn list_payments(
    State(state): State<DispatchState>,
    caller: Option<Extension<Caller>>,
    Query(query): Query<PaymentHistoryQuery>,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    let caller = require_caller(caller)?;
    let payments = state
        .queries
        .process(ListPayments {
            caller,
            customer_email: query.email,
        })
        .await?;
    Ok(Json(payments))
}
