use crate::config::TrackingConfig;
use crate::entities::tracking::generate_tracking_id;
use crate::entities::{
    ApprovalStatus, DeliveryStatus, Parcel, PaymentState, Rider, TrackingStatus, WorkStatus,
};
use crate::services::tracking_ledger::TrackingLedgerService;
use crate::storage::{ParcelStore, RiderStore};
use framework::{Error, Processor};
use identity::services::verifier::Caller;
use identity::utils::rbac;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// How many fresh tracking ids to try before giving up. Collisions are
/// astronomically unlikely at the configured suffix length, so hitting
/// this limit means the generator is broken.
const MAX_TRACKING_ATTEMPTS: usize = 3;

/// Owns the delivery lifecycle writes: creation, rider assignment and
/// status progression. Every transition lands one ledger event.
#[derive(Clone)]
pub struct ParcelFlowService {
    pub parcels: Arc<dyn ParcelStore>,
    pub riders: Arc<dyn RiderStore>,
    pub ledger: TrackingLedgerService,
    pub tracking: TrackingConfig,
}

/// Request body for parcel creation; the sender declares both endpoints
/// of the delivery and the cost to be collected.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParcel {
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_region: String,
    pub sender_district: String,
    pub sender_address: String,
    pub sender_contact: String,
    pub receiver_name: String,
    pub receiver_region: String,
    pub receiver_district: String,
    pub receiver_address: String,
    pub receiver_contact: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreateParcel {
    pub caller: Caller,
    pub details: NewParcel,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParcelOutcome {
    pub parcel: Parcel,
    /// False when the creation milestone could not be recorded; the
    /// sweep backfills nothing here, so surface it instead of hiding it.
    pub event_appended: bool,
}

impl Processor<CreateParcel> for ParcelFlowService {
    type Output = CreateParcelOutcome;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: CreateParcel) -> Result<CreateParcelOutcome, Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.details.sender_email)?;
        if input.details.cost <= Decimal::ZERO {
            return Err(Error::InvalidInput);
        }
        let parcel = self.insert_with_fresh_tracking_id(input.details).await?;
        let event_appended = match self
            .ledger
            .append(&parcel.tracking_id, TrackingStatus::ParcelCreated)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(tracking_id = %parcel.tracking_id, "creation event lost: {e}");
                false
            }
        };
        Ok(CreateParcelOutcome {
            parcel,
            event_appended,
        })
    }
}

impl ParcelFlowService {
    /// The tracking id unique index is the authority on freshness:
    /// insert and regenerate on conflict instead of look-then-insert.
    async fn insert_with_fresh_tracking_id(&self, details: NewParcel) -> Result<Parcel, Error> {
        for _ in 0..MAX_TRACKING_ATTEMPTS {
            let tracking_id = generate_tracking_id(
                &self.tracking.prefix,
                self.tracking.suffix_len,
                framework::now_time().date(),
            )?;
            let parcel = build_parcel(tracking_id, &details);
            match self.parcels.insert(parcel.clone()).await {
                Ok(()) => return Ok(parcel),
                Err(Error::Conflict) => {
                    warn!(tracking_id = %parcel.tracking_id, "tracking id collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::BusinessPanic(anyhow::anyhow!(
            "no fresh tracking id after {MAX_TRACKING_ATTEMPTS} attempts"
        )))
    }
}

fn build_parcel(tracking_id: String, details: &NewParcel) -> Parcel {
    Parcel {
        id: Uuid::new_v4(),
        tracking_id,
        title: details.title.clone(),
        sender_name: details.sender_name.clone(),
        sender_email: details.sender_email.clone(),
        sender_region: details.sender_region.clone(),
        sender_district: details.sender_district.clone(),
        sender_address: details.sender_address.clone(),
        sender_contact: details.sender_contact.clone(),
        receiver_name: details.receiver_name.clone(),
        receiver_region: details.receiver_region.clone(),
        receiver_district: details.receiver_district.clone(),
        receiver_address: details.receiver_address.clone(),
        receiver_contact: details.receiver_contact.clone(),
        cost: details.cost,
        delivery_status: DeliveryStatus::Created,
        payment_status: PaymentState::Unpaid,
        rider_id: None,
        rider_email: None,
        rider_name: None,
        created_at: framework::now_time(),
    }
}

#[derive(Debug, Clone)]
pub struct AssignRider {
    pub caller: Caller,
    pub parcel_id: Uuid,
    pub rider_id: Uuid,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRiderOutcome {
    pub parcel: Parcel,
    pub rider: Rider,
    /// `None` when there was no different rider to hand the parcel over
    /// from; otherwise whether releasing them back to available worked.
    pub prior_rider_released: Option<bool>,
    pub rider_marked: bool,
    pub event_appended: bool,
}

impl Processor<AssignRider> for ParcelFlowService {
    type Output = AssignRiderOutcome;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: AssignRider) -> Result<AssignRiderOutcome, Error> {
        rbac::ensure_admin(&input.caller)?;
        let parcel = self
            .parcels
            .find(input.parcel_id)
            .await?
            .ok_or(Error::NotFound)?;
        let rider = self
            .riders
            .find(input.rider_id)
            .await?
            .ok_or(Error::NotFound)?;
        if rider.status != ApprovalStatus::Approved {
            return Err(Error::InvalidInput);
        }
        if !parcel.delivery_status.allows_rider_assignment() {
            return Err(Error::InvalidInput);
        }

        // Primary write; everything after is follow-up bookkeeping.
        let updated = self
            .parcels
            .assign_rider(parcel.id, parcel.delivery_status, &rider)
            .await?;

        let prior_rider_released = match parcel.rider_id.filter(|prior| *prior != rider.id) {
            Some(prior) => Some(self.release_rider(prior).await),
            None => None,
        };
        let (rider, rider_marked) = match self
            .riders
            .set_work_status(rider.id, WorkStatus::InDelivery)
            .await
        {
            Ok(updated_rider) => (updated_rider, true),
            Err(e) => {
                error!(rider = %rider.id, "rider not marked in delivery: {e}");
                (rider, false)
            }
        };
        let event_appended = self
            .append_best_effort(&updated.tracking_id, TrackingStatus::RiderAssigned)
            .await;

        Ok(AssignRiderOutcome {
            parcel: updated,
            rider,
            prior_rider_released,
            rider_marked,
            event_appended,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdateParcelStatus {
    pub parcel_id: Uuid,
    pub new_status: DeliveryStatus,
    /// Rider confirming the milestone, when the caller knows it. Falls
    /// back to the rider on the parcel record.
    pub rider_id: Option<Uuid>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParcelStatusOutcome {
    pub parcel: Parcel,
    pub rider_released: Option<bool>,
    pub event_appended: bool,
}

impl Processor<UpdateParcelStatus> for ParcelFlowService {
    type Output = UpdateParcelStatusOutcome;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: UpdateParcelStatus) -> Result<UpdateParcelStatusOutcome, Error> {
        let parcel = self
            .parcels
            .find(input.parcel_id)
            .await?
            .ok_or(Error::NotFound)?;
        if !parcel.delivery_status.can_progress_to(input.new_status) {
            return Err(Error::InvalidInput);
        }

        let updated = self
            .parcels
            .set_delivery_status(parcel.id, parcel.delivery_status, input.new_status)
            .await?;

        let rider_released = if input.new_status.is_terminal() {
            match input.rider_id.or(parcel.rider_id) {
                Some(rider_id) => Some(self.release_rider(rider_id).await),
                None => None,
            }
        } else {
            None
        };
        let event_appended = match TrackingStatus::for_delivery(input.new_status) {
            Some(status) => self.append_best_effort(&updated.tracking_id, status).await,
            None => false,
        };

        Ok(UpdateParcelStatusOutcome {
            parcel: updated,
            rider_released,
            event_appended,
        })
    }
}

impl ParcelFlowService {
    async fn release_rider(&self, rider_id: Uuid) -> bool {
        match self
            .riders
            .set_work_status(rider_id, WorkStatus::Available)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                // The sweep releases stranded riders later.
                error!(rider = %rider_id, "rider not released: {e}");
                false
            }
        }
    }

    async fn append_best_effort(&self, tracking_id: &str, status: TrackingStatus) -> bool {
        match self.ledger.append(tracking_id, status).await {
            Ok(_) => true,
            Err(e) => {
                error!(%tracking_id, status = %status, "ledger event lost: {e}");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetParcel {
    pub parcel_id: Uuid,
}

impl Processor<GetParcel> for ParcelFlowService {
    type Output = Parcel;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: GetParcel) -> Result<Parcel, Error> {
        self.parcels
            .find(input.parcel_id)
            .await?
            .ok_or(Error::NotFound)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteParcel {
    pub caller: Caller,
    pub parcel_id: Uuid,
}

impl Processor<DeleteParcel> for ParcelFlowService {
    type Output = ();
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: DeleteParcel) -> Result<(), Error> {
        let parcel = self
            .parcels
            .find(input.parcel_id)
            .await?
            .ok_or(Error::NotFound)?;
        rbac::ensure_self_or_admin(&input.caller, &parcel.sender_email)?;
        if !self.parcels.delete(parcel.id).await? {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryParcelStore, MemoryRiderStore, MemoryTrackingStore, RiderFilter};
    use identity::entities::user_account::Role;

    fn service() -> ParcelFlowService {
        ParcelFlowService {
            parcels: Arc::new(MemoryParcelStore::new()),
            riders: Arc::new(MemoryRiderStore::new()),
            ledger: TrackingLedgerService::new(Arc::new(MemoryTrackingStore::new())),
            tracking: TrackingConfig::default(),
        }
    }

    fn admin() -> Caller {
        Caller::new("ops@example.com", Role::Admin)
    }

    fn sender() -> Caller {
        Caller::new("alice@example.com", Role::User)
    }

    fn new_parcel() -> NewParcel {
        NewParcel {
            title: "Books".into(),
            sender_name: "Alice".into(),
            sender_email: "alice@example.com".into(),
            sender_region: "Dhaka".into(),
            sender_district: "Gulshan".into(),
            sender_address: "House 1, Road 2".into(),
            sender_contact: "01700000001".into(),
            receiver_name: "Bob".into(),
            receiver_region: "Chattogram".into(),
            receiver_district: "Pahartali".into(),
            receiver_address: "House 9".into(),
            receiver_contact: "01700000002".into(),
            cost: Decimal::new(12050, 2),
        }
    }

    fn approved_rider(email: &str) -> Rider {
        Rider {
            id: Uuid::new_v4(),
            name: "Karim".into(),
            email: email.into(),
            phone: "01800000001".into(),
            region: "Dhaka".into(),
            district: "Gulshan".into(),
            bike_registration: "DHK-11-2233".into(),
            status: ApprovalStatus::Approved,
            work_status: WorkStatus::Available,
            created_at: framework::now_time(),
        }
    }

    async fn paid_parcel(service: &ParcelFlowService) -> Result<Parcel, Error> {
        let created = service
            .process(CreateParcel {
                caller: sender(),
                details: new_parcel(),
            })
            .await?;
        service
            .parcels
            .mark_paid(created.parcel.id)
            .await?
            .ok_or(Error::NotFound)
    }

    #[tokio::test]
    async fn creation_stamps_tracking_id_and_logs_the_milestone() -> anyhow::Result<()> {
        let service = service();
        let outcome = service
            .process(CreateParcel {
                caller: sender(),
                details: new_parcel(),
            })
            .await?;

        assert!(outcome.parcel.tracking_id.starts_with("PCL-"));
        assert_eq!(outcome.parcel.delivery_status, DeliveryStatus::Created);
        assert_eq!(outcome.parcel.payment_status, PaymentState::Unpaid);
        assert!(outcome.event_appended);
        assert!(
            service
                .ledger
                .has_event(&outcome.parcel.tracking_id, TrackingStatus::ParcelCreated)
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn creation_rejects_foreign_senders_and_free_parcels() -> anyhow::Result<()> {
        let service = service();
        let mut foreign = new_parcel();
        foreign.sender_email = "mallory@example.com".into();
        assert!(matches!(
            service
                .process(CreateParcel {
                    caller: sender(),
                    details: foreign,
                })
                .await,
            Err(Error::PermissionsDenied)
        ));

        let mut free = new_parcel();
        free.cost = Decimal::ZERO;
        assert!(matches!(
            service
                .process(CreateParcel {
                    caller: sender(),
                    details: free,
                })
                .await,
            Err(Error::InvalidInput)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn assignment_needs_admin_and_an_approved_rider() -> anyhow::Result<()> {
        let service = service();
        let parcel = paid_parcel(&service).await?;
        let mut rider = approved_rider("karim@example.com");
        rider.status = ApprovalStatus::Pending;
        let rider_id = rider.id;
        service.riders.insert(rider).await?;

        assert!(matches!(
            service
                .process(AssignRider {
                    caller: sender(),
                    parcel_id: parcel.id,
                    rider_id,
                })
                .await,
            Err(Error::PermissionsDenied)
        ));
        assert!(matches!(
            service
                .process(AssignRider {
                    caller: admin(),
                    parcel_id: parcel.id,
                    rider_id,
                })
                .await,
            Err(Error::InvalidInput)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unpaid_parcels_cannot_take_a_rider() -> anyhow::Result<()> {
        let service = service();
        let created = service
            .process(CreateParcel {
                caller: sender(),
                details: new_parcel(),
            })
            .await?;
        let rider = approved_rider("karim@example.com");
        let rider_id = rider.id;
        service.riders.insert(rider).await?;

        assert!(matches!(
            service
                .process(AssignRider {
                    caller: admin(),
                    parcel_id: created.parcel.id,
                    rider_id,
                })
                .await,
            Err(Error::InvalidInput)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reassignment_returns_the_prior_rider_to_available() -> anyhow::Result<()> {
        let service = service();
        let parcel = paid_parcel(&service).await?;
        let first = approved_rider("karim@example.com");
        let second = approved_rider("rahim@example.com");
        let (first_id, second_id) = (first.id, second.id);
        service.riders.insert(first).await?;
        service.riders.insert(second).await?;

        let assigned = service
            .process(AssignRider {
                caller: admin(),
                parcel_id: parcel.id,
                rider_id: first_id,
            })
            .await?;
        assert_eq!(assigned.parcel.delivery_status, DeliveryStatus::RiderAssigned);
        assert_eq!(assigned.rider.work_status, WorkStatus::InDelivery);
        assert_eq!(assigned.prior_rider_released, None);

        let reassigned = service
            .process(AssignRider {
                caller: admin(),
                parcel_id: parcel.id,
                rider_id: second_id,
            })
            .await?;
        assert_eq!(reassigned.prior_rider_released, Some(true));
        assert_eq!(reassigned.parcel.rider_email.as_deref(), Some("rahim@example.com"));

        let released = service.riders.find(first_id).await?.ok_or(Error::NotFound)?;
        assert_eq!(released.work_status, WorkStatus::Available);
        let busy = service.riders.find(second_id).await?.ok_or(Error::NotFound)?;
        assert_eq!(busy.work_status, WorkStatus::InDelivery);
        Ok(())
    }

    #[tokio::test]
    async fn delivery_releases_the_rider_and_closes_the_parcel() -> anyhow::Result<()> {
        let service = service();
        let parcel = paid_parcel(&service).await?;
        let rider = approved_rider("karim@example.com");
        let rider_id = rider.id;
        service.riders.insert(rider).await?;
        service
            .process(AssignRider {
                caller: admin(),
                parcel_id: parcel.id,
                rider_id,
            })
            .await?;

        let arriving = service
            .process(UpdateParcelStatus {
                parcel_id: parcel.id,
                new_status: DeliveryStatus::RiderArriving,
                rider_id: None,
            })
            .await?;
        assert_eq!(arriving.rider_released, None);

        let delivered = service
            .process(UpdateParcelStatus {
                parcel_id: parcel.id,
                new_status: DeliveryStatus::ParcelDelivered,
                rider_id: None,
            })
            .await?;
        assert_eq!(delivered.parcel.delivery_status, DeliveryStatus::ParcelDelivered);
        assert_eq!(delivered.rider_released, Some(true));
        assert!(delivered.event_appended);

        let released = service.riders.find(rider_id).await?.ok_or(Error::NotFound)?;
        assert_eq!(released.work_status, WorkStatus::Available);

        // Terminal: nothing moves a delivered parcel.
        assert!(matches!(
            service
                .process(UpdateParcelStatus {
                    parcel_id: parcel.id,
                    new_status: DeliveryStatus::RiderArriving,
                    rider_id: None,
                })
                .await,
            Err(Error::InvalidInput)
        ));
        let in_delivery = service
            .riders
            .list(RiderFilter {
                work_status: Some(WorkStatus::InDelivery),
                ..RiderFilter::default()
            })
            .await?;
        assert!(in_delivery.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn deletion_is_limited_to_the_sender_or_an_admin() -> anyhow::Result<()> {
        let service = service();
        let created = service
            .process(CreateParcel {
                caller: sender(),
                details: new_parcel(),
            })
            .await?;

        let stranger = Caller::new("mallory@example.com", Role::User);
        assert!(matches!(
            service
                .process(DeleteParcel {
                    caller: stranger,
                    parcel_id: created.parcel.id,
                })
                .await,
            Err(Error::PermissionsDenied)
        ));

        service
            .process(DeleteParcel {
                caller: sender(),
                parcel_id: created.parcel.id,
            })
            .await?;
        assert!(matches!(
            service
                .process(GetParcel {
                    parcel_id: created.parcel.id,
                })
                .await,
            Err(Error::NotFound)
        ));
        Ok(())
    }
}
