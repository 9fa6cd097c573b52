use crate::entities::{TrackingEvent, TrackingStatus};
use crate::storage::TrackingStore;
use framework::{Error, Processor};
use std::sync::Arc;
use tracing::instrument;

/// Append-only audit trail keyed by tracking id. Writers never update
/// or remove events; repair jobs only add the ones that went missing.
#[derive(Clone)]
pub struct TrackingLedgerService {
    pub events: Arc<dyn TrackingStore>,
}

impl TrackingLedgerService {
    pub fn new(events: Arc<dyn TrackingStore>) -> Self {
        Self { events }
    }

    /// Appends one milestone stamped with the current time.
    pub async fn append(
        &self,
        tracking_id: &str,
        status: TrackingStatus,
    ) -> Result<TrackingEvent, Error> {
        self.events
            .append(tracking_id, status, &status.detail(), framework::now_time())
            .await
    }

    pub async fn has_event(&self, tracking_id: &str, status: TrackingStatus) -> Result<bool, Error> {
        self.events.has_event(tracking_id, status).await
    }
}

/// Public read side: anyone holding a tracking id may follow the parcel.
#[derive(Debug, Clone)]
pub struct ReadTrackingHistory {
    pub tracking_id: String,
}

impl Processor<ReadTrackingHistory> for TrackingLedgerService {
    type Output = Vec<TrackingEvent>;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ReadTrackingHistory) -> Result<Vec<TrackingEvent>, Error> {
        self.events.history(&input.tracking_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTrackingStore;

    #[tokio::test]
    async fn history_keeps_append_order_and_detail_text() -> anyhow::Result<()> {
        let ledger = TrackingLedgerService::new(Arc::new(MemoryTrackingStore::new()));
        ledger.append("PCL-1", TrackingStatus::ParcelCreated).await?;
        ledger.append("PCL-1", TrackingStatus::ParcelPaid).await?;
        ledger.append("PCL-2", TrackingStatus::ParcelCreated).await?;

        let history = ledger
            .process(ReadTrackingHistory {
                tracking_id: "PCL-1".into(),
            })
            .await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, TrackingStatus::ParcelCreated);
        assert_eq!(history[0].detail, "parcel created");
        assert_eq!(history[1].status, TrackingStatus::ParcelPaid);

        assert!(ledger.has_event("PCL-1", TrackingStatus::ParcelPaid).await?);
        assert!(!ledger.has_event("PCL-2", TrackingStatus::ParcelPaid).await?);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_tracking_id_reads_empty() -> anyhow::Result<()> {
        let ledger = TrackingLedgerService::new(Arc::new(MemoryTrackingStore::new()));
        let history = ledger
            .process(ReadTrackingHistory {
                tracking_id: "PCL-MISSING".into(),
            })
            .await?;
        assert!(history.is_empty());
        Ok(())
    }
}
