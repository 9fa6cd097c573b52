//! In-memory stores backing tests and provider-less deployments.

use super::{
    ParcelFilter, ParcelStore, PaymentInsertOutcome, PaymentStore, RiderFilter, RiderStore,
    TrackingStore,
};
use crate::entities::{
    ApprovalStatus, DeliveryStatus, Parcel, PaymentRecord, PaymentState, Rider, TrackingEvent,
    TrackingStatus, WorkStatus,
};
use async_trait::async_trait;
use framework::Error;
use std::collections::HashMap;
use std::sync::Arc;
use time::PrimitiveDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryParcelStore {
    parcels: Arc<RwLock<HashMap<Uuid, Parcel>>>,
}

impl MemoryParcelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParcelStore for MemoryParcelStore {
    async fn insert(&self, parcel: Parcel) -> Result<(), Error> {
        let mut parcels = self.parcels.write().await;
        if parcels.values().any(|p| p.tracking_id == parcel.tracking_id) {
            return Err(Error::Conflict);
        }
        parcels.insert(parcel.id, parcel);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Parcel>, Error> {
        Ok(self.parcels.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: ParcelFilter) -> Result<Vec<Parcel>, Error> {
        let parcels = self.parcels.read().await;
        let mut out: Vec<Parcel> = parcels
            .values()
            .filter(|p| {
                filter
                    .sender_email
                    .as_deref()
                    .is_none_or(|email| p.sender_email == email)
            })
            .filter(|p| {
                filter
                    .delivery_status
                    .is_none_or(|status| p.delivery_status == status)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_for_rider(
        &self,
        rider_email: &str,
        exclude_delivered: bool,
    ) -> Result<Vec<Parcel>, Error> {
        let parcels = self.parcels.read().await;
        let mut out: Vec<Parcel> = parcels
            .values()
            .filter(|p| p.rider_email.as_deref() == Some(rider_email))
            .filter(|p| {
                if exclude_delivered {
                    p.delivery_status != DeliveryStatus::ParcelDelivered
                } else {
                    p.delivery_status == DeliveryStatus::ParcelDelivered
                }
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn assign_rider(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        rider: &Rider,
    ) -> Result<Parcel, Error> {
        let mut parcels = self.parcels.write().await;
        let parcel = parcels.get_mut(&id).ok_or(Error::NotFound)?;
        if parcel.delivery_status != expected {
            return Err(Error::Conflict);
        }
        parcel.delivery_status = DeliveryStatus::RiderAssigned;
        parcel.rider_id = Some(rider.id);
        parcel.rider_email = Some(rider.email.clone());
        parcel.rider_name = Some(rider.name.clone());
        Ok(parcel.clone())
    }

    async fn set_delivery_status(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<Parcel, Error> {
        let mut parcels = self.parcels.write().await;
        let parcel = parcels.get_mut(&id).ok_or(Error::NotFound)?;
        if parcel.delivery_status != expected {
            return Err(Error::Conflict);
        }
        parcel.delivery_status = next;
        Ok(parcel.clone())
    }

    async fn mark_paid(&self, id: Uuid) -> Result<Option<Parcel>, Error> {
        let mut parcels = self.parcels.write().await;
        let Some(parcel) = parcels.get_mut(&id) else {
            return Ok(None);
        };
        if parcel.payment_status != PaymentState::Unpaid
            || parcel.delivery_status != DeliveryStatus::Created
        {
            return Ok(None);
        }
        parcel.payment_status = PaymentState::Paid;
        parcel.delivery_status = DeliveryStatus::PendingPickup;
        Ok(Some(parcel.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, Error> {
        Ok(self.parcels.write().await.remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct MemoryRiderStore {
    riders: Arc<RwLock<HashMap<Uuid, Rider>>>,
}

impl MemoryRiderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RiderStore for MemoryRiderStore {
    async fn insert(&self, rider: Rider) -> Result<(), Error> {
        let mut riders = self.riders.write().await;
        if riders.values().any(|r| r.email == rider.email) {
            return Err(Error::Conflict);
        }
        riders.insert(rider.id, rider);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Rider>, Error> {
        Ok(self.riders.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, Error> {
        let riders = self.riders.read().await;
        let mut out: Vec<Rider> = riders
            .values()
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .filter(|r| {
                filter
                    .district
                    .as_deref()
                    .is_none_or(|district| r.district == district)
            })
            .filter(|r| {
                filter
                    .work_status
                    .is_none_or(|status| r.work_status == status)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn set_work_status(&self, id: Uuid, status: WorkStatus) -> Result<Rider, Error> {
        let mut riders = self.riders.write().await;
        let rider = riders.get_mut(&id).ok_or(Error::NotFound)?;
        rider.work_status = status;
        Ok(rider.clone())
    }

    async fn review(&self, id: Uuid, status: ApprovalStatus) -> Result<Rider, Error> {
        let mut riders = self.riders.write().await;
        let rider = riders.get_mut(&id).ok_or(Error::NotFound)?;
        rider.status = status;
        rider.work_status = WorkStatus::Available;
        Ok(rider.clone())
    }
}

#[derive(Clone, Default)]
pub struct MemoryPaymentStore {
    payments: Arc<RwLock<Vec<PaymentRecord>>>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert_unique(&self, payment: PaymentRecord) -> Result<PaymentInsertOutcome, Error> {
        let mut payments = self.payments.write().await;
        if payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Ok(PaymentInsertOutcome::DuplicateTransaction);
        }
        payments.push(payment);
        Ok(PaymentInsertOutcome::Inserted)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, Error> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn list_by_customer(&self, email: &str) -> Result<Vec<PaymentRecord>, Error> {
        let payments = self.payments.read().await;
        let mut out: Vec<PaymentRecord> = payments
            .iter()
            .filter(|p| p.customer_email.as_deref() == Some(email))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(out)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<PaymentRecord>, Error> {
        let payments = self.payments.read().await;
        let mut out: Vec<PaymentRecord> = payments.iter().cloned().collect();
        out.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }
}

#[derive(Clone, Default)]
pub struct MemoryTrackingStore {
    events: Arc<RwLock<Vec<TrackingEvent>>>,
}

impl MemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for MemoryTrackingStore {
    async fn append(
        &self,
        tracking_id: &str,
        status: TrackingStatus,
        detail: &str,
        at: PrimitiveDateTime,
    ) -> Result<TrackingEvent, Error> {
        let mut events = self.events.write().await;
        let id = events.last().map(|e| e.id + 1).unwrap_or(1);
        let event = TrackingEvent {
            id,
            tracking_id: tracking_id.to_owned(),
            status,
            detail: detail.to_owned(),
            created_at: at,
        };
        events.push(event.clone());
        Ok(event)
    }

    async fn history(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, Error> {
        let events = self.events.read().await;
        let mut out: Vec<TrackingEvent> = events
            .iter()
            .filter(|e| e.tracking_id == tracking_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn has_event(&self, tracking_id: &str, status: TrackingStatus) -> Result<bool, Error> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .any(|e| e.tracking_id == tracking_id && e.status == status))
    }
}
