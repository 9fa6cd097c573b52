use crate::entities::{Parcel, PaymentRecord, Rider};
use crate::storage::{ParcelFilter, ParcelStore, PaymentStore, RiderFilter, RiderStore};
use framework::{Error, Processor};
use identity::services::verifier::Caller;
use identity::utils::rbac;
use std::sync::Arc;
use tracing::instrument;

/// Read side of the delivery domain. Every listing is either scoped to
/// the caller's own email or gated behind the admin role.
#[derive(Clone)]
pub struct QueryService {
    pub parcels: Arc<dyn ParcelStore>,
    pub riders: Arc<dyn RiderStore>,
    pub payments: Arc<dyn PaymentStore>,
}

#[derive(Debug, Clone)]
pub struct ListParcels {
    pub caller: Caller,
    pub filter: ParcelFilter,
}

impl Processor<ListParcels> for QueryService {
    type Output = Vec<Parcel>;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ListParcels) -> Result<Vec<Parcel>, Error> {
        match &input.filter.sender_email {
            Some(email) => rbac::ensure_self_or_admin(&input.caller, email)?,
            // An unscoped listing exposes every sender's data.
            None => rbac::ensure_admin(&input.caller)?,
        }
        self.parcels.list(input.filter).await
    }
}

#[derive(Debug, Clone)]
pub struct ListParcelsForRider {
    pub caller: Caller,
    pub rider_email: String,
    /// True lists the active workload, false the delivered history.
    pub exclude_delivered: bool,
}

impl Processor<ListParcelsForRider> for QueryService {
    type Output = Vec<Parcel>;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ListParcelsForRider) -> Result<Vec<Parcel>, Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.rider_email)?;
        self.parcels
            .list_for_rider(&input.rider_email, input.exclude_delivered)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ListRiders {
    pub caller: Caller,
    pub filter: RiderFilter,
}

impl Processor<ListRiders> for QueryService {
    type Output = Vec<Rider>;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ListRiders) -> Result<Vec<Rider>, Error> {
        rbac::ensure_admin(&input.caller)?;
        self.riders.list(input.filter).await
    }
}

#[derive(Debug, Clone)]
pub struct ListPayments {
    pub caller: Caller,
    pub customer_email: String,
}

impl Processor<ListPayments> for QueryService {
    type Output = Vec<PaymentRecord>;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ListPayments) -> Result<Vec<PaymentRecord>, Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.customer_email)?;
        self.payments.list_by_customer(&input.customer_email).await
    }
}
