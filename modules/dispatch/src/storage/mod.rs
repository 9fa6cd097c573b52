use crate::entities::{
    ApprovalStatus, DeliveryStatus, Parcel, PaymentRecord, Rider, TrackingEvent, TrackingStatus,
    WorkStatus,
};
use async_trait::async_trait;
use framework::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryParcelStore, MemoryPaymentStore, MemoryRiderStore, MemoryTrackingStore};
pub use postgres::{PgParcelStore, PgPaymentStore, PgRiderStore, PgTrackingStore};

#[derive(Debug, Clone, Default)]
pub struct ParcelFilter {
    pub sender_email: Option<String>,
    pub delivery_status: Option<DeliveryStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct RiderFilter {
    pub status: Option<ApprovalStatus>,
    pub district: Option<String>,
    pub work_status: Option<WorkStatus>,
}

/// Result of the gated payment insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentInsertOutcome {
    Inserted,
    /// A record with the same transaction id already exists.
    DuplicateTransaction,
}

#[async_trait]
pub trait ParcelStore: Send + Sync + 'static {
    async fn insert(&self, parcel: Parcel) -> Result<(), Error>;

    async fn find(&self, id: Uuid) -> Result<Option<Parcel>, Error>;

    /// Filtered listing, newest first.
    async fn list(&self, filter: ParcelFilter) -> Result<Vec<Parcel>, Error>;

    /// Parcels assigned to a rider: the active set when
    /// `exclude_delivered`, otherwise the delivered history.
    async fn list_for_rider(
        &self,
        rider_email: &str,
        exclude_delivered: bool,
    ) -> Result<Vec<Parcel>, Error>;

    /// Attaches the rider iff the parcel is still in `expected`.
    /// Fails with [`Error::Conflict`] when the status moved underneath.
    async fn assign_rider(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        rider: &Rider,
    ) -> Result<Parcel, Error>;

    /// Moves the status iff the parcel is still in `expected`.
    async fn set_delivery_status(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<Parcel, Error>;

    /// Post-payment flip: `unpaid`/`created` becomes `paid`/`pending-pickup`.
    /// Returns `None` when nothing matched, so repeated calls are harmless.
    async fn mark_paid(&self, id: Uuid) -> Result<Option<Parcel>, Error>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait RiderStore: Send + Sync + 'static {
    /// Fails with [`Error::Conflict`] when the email is already registered.
    async fn insert(&self, rider: Rider) -> Result<(), Error>;

    async fn find(&self, id: Uuid) -> Result<Option<Rider>, Error>;

    async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, Error>;

    async fn set_work_status(&self, id: Uuid, status: WorkStatus) -> Result<Rider, Error>;

    /// Settles an application and resets the rider to available.
    async fn review(&self, id: Uuid, status: ApprovalStatus) -> Result<Rider, Error>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync + 'static {
    /// Inserts unless the transaction id is already recorded. The
    /// duplicate outcome is the already-reconciled signal, so this is
    /// the only write path the reconciler trusts under races.
    async fn insert_unique(&self, payment: PaymentRecord) -> Result<PaymentInsertOutcome, Error>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, Error>;

    /// Customer payment history, most recently settled first.
    async fn list_by_customer(&self, email: &str) -> Result<Vec<PaymentRecord>, Error>;

    /// Most recently settled payments, bounded by `limit`.
    async fn list_recent(&self, limit: i64) -> Result<Vec<PaymentRecord>, Error>;
}

#[async_trait]
pub trait TrackingStore: Send + Sync + 'static {
    /// Append-only insert; the store assigns the event id.
    async fn append(
        &self,
        tracking_id: &str,
        status: TrackingStatus,
        detail: &str,
        at: PrimitiveDateTime,
    ) -> Result<TrackingEvent, Error>;

    /// Full history for one tracking id in append order.
    async fn history(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, Error>;

    async fn has_event(&self, tracking_id: &str, status: TrackingStatus) -> Result<bool, Error>;
}
