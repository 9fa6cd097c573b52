use crate::services::{
    CheckoutService, ParcelFlowService, QueryService, RiderRegistryService, TrackingLedgerService,
};
use axum::Router;

pub mod parcels;
pub mod payments;
pub mod riders;
pub mod trackings;

#[derive(Clone)]
pub struct DispatchState {
    pub parcel_flow: ParcelFlowService,
    pub checkout: CheckoutService,
    pub registry: RiderRegistryService,
    pub ledger: TrackingLedgerService,
    pub queries: QueryService,
}

pub fn router(state: DispatchState) -> Router {
    Router::new()
        .merge(parcels::routes())
        .merge(payments::routes())
        .merge(riders::routes())
        .merge(trackings::routes())
        .with_state(state)
}
