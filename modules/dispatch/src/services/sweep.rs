use crate::entities::{PaymentState, TrackingStatus, WorkStatus};
use crate::services::tracking_ledger::TrackingLedgerService;
use crate::storage::{ParcelStore, PaymentStore, RiderFilter, RiderStore};
use framework::{Error, Processor};
use std::sync::Arc;
use time::PrimitiveDateTime;
use tracing::{error, info, instrument};

/// Background repair for the write paths that are best-effort at
/// request time: riders stuck in delivery with no active parcel, and
/// settled payments whose parcel flip or ledger milestone was lost.
#[derive(Clone)]
pub struct ConsistencySweep {
    pub parcels: Arc<dyn ParcelStore>,
    pub riders: Arc<dyn RiderStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub ledger: TrackingLedgerService,
    /// How many recent payments to re-check per run.
    pub payment_window: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub riders_released: u32,
    pub parcels_repaired: u32,
    pub events_repaired: u32,
}

impl Processor<PrimitiveDateTime> for ConsistencySweep {
    type Output = SweepReport;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, _now: PrimitiveDateTime) -> Result<SweepReport, Error> {
        let mut report = SweepReport::default();

        let busy = self
            .riders
            .list(RiderFilter {
                work_status: Some(WorkStatus::InDelivery),
                ..RiderFilter::default()
            })
            .await?;
        for rider in busy {
            let active = self.parcels.list_for_rider(&rider.email, true).await?;
            if !active.is_empty() {
                continue;
            }
            match self
                .riders
                .set_work_status(rider.id, WorkStatus::Available)
                .await
            {
                Ok(_) => {
                    info!(rider = %rider.id, "released rider with no active parcel");
                    report.riders_released += 1;
                }
                Err(e) => error!(rider = %rider.id, "rider release failed: {e}"),
            }
        }

        for payment in self.payments.list_recent(self.payment_window).await? {
            if let Some(parcel) = self.parcels.find(payment.parcel_id).await? {
                if parcel.payment_status == PaymentState::Unpaid
                    && self.parcels.mark_paid(parcel.id).await?.is_some()
                {
                    info!(parcel = %parcel.id, "re-applied a lost payment flip");
                    report.parcels_repaired += 1;
                }
            }
            if !self
                .ledger
                .has_event(&payment.tracking_id, TrackingStatus::ParcelPaid)
                .await?
            {
                self.ledger
                    .append(&payment.tracking_id, TrackingStatus::ParcelPaid)
                    .await?;
                info!(tracking_id = %payment.tracking_id, "backfilled a missing payment event");
                report.events_repaired += 1;
            }
        }

        Ok(report)
    }
}
