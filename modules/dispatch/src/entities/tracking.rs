use super::DeliveryStatus;
use rand::Rng;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

/// One row of a parcel's public audit trail. Append-only; `id` is
/// assigned by the store and orders events within a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub id: i64,
    pub tracking_id: String,
    pub status: TrackingStatus,
    pub detail: String,
    pub created_at: PrimitiveDateTime,
}

/// The closed set of milestones a tracking ledger may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "delivery.tracking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    ParcelCreated,
    ParcelPaid,
    RiderAssigned,
    RiderArriving,
    ParcelDelivered,
}

impl TrackingStatus {
    pub fn label(self) -> &'static str {
        match self {
            TrackingStatus::ParcelCreated => "parcel_created",
            TrackingStatus::ParcelPaid => "parcel_paid",
            TrackingStatus::RiderAssigned => "rider_assigned",
            TrackingStatus::RiderArriving => "rider_arriving",
            TrackingStatus::ParcelDelivered => "parcel_delivered",
        }
    }

    /// Human-readable form used for the event detail text.
    pub fn detail(self) -> String {
        self.label().replace('_', " ")
    }

    /// The milestone recorded when a parcel reaches `status`, if any.
    /// Creation and payment milestones are recorded by their own flows.
    pub fn for_delivery(status: DeliveryStatus) -> Option<TrackingStatus> {
        match status {
            DeliveryStatus::RiderAssigned => Some(TrackingStatus::RiderAssigned),
            DeliveryStatus::RiderArriving => Some(TrackingStatus::RiderArriving),
            DeliveryStatus::ParcelDelivered => Some(TrackingStatus::ParcelDelivered),
            DeliveryStatus::Created | DeliveryStatus::PendingPickup => None,
        }
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const DATE_STAMP: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Builds a candidate tracking id: `{prefix}-{yyyymmdd}-{random suffix}`.
/// Uniqueness is the caller's job to verify against storage.
pub fn generate_tracking_id(
    prefix: &str,
    suffix_len: usize,
    on: Date,
) -> Result<String, framework::Error> {
    let stamp = on
        .format(&DATE_STAMP)
        .map_err(|e| framework::Error::BusinessPanic(e.into()))?;
    let mut rng = rand::rng();
    let suffix: String = (0..suffix_len)
        .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    Ok(format!("{prefix}-{stamp}-{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use time::macros::date;

    #[test]
    fn tracking_ids_follow_the_documented_shape() -> anyhow::Result<()> {
        let id = generate_tracking_id("PCL", 10, date!(2025 - 03 - 07))?;
        let mut parts = id.split('-');
        assert_eq!(parts.next(), Some("PCL"));
        assert_eq!(parts.next(), Some("20250307"));
        let suffix = parts.next().unwrap_or_default();
        assert_eq!(suffix.len(), 10);
        assert!(suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        assert_eq!(parts.next(), None);
        Ok(())
    }

    #[test]
    fn tracking_ids_rarely_collide() -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            seen.insert(generate_tracking_id("PCL", 10, date!(2025 - 03 - 07))?);
        }
        // 36^10 possibilities; 1000 draws colliding would point at a
        // broken generator rather than bad luck.
        assert_eq!(seen.len(), 1000);
        Ok(())
    }

    #[test]
    fn delivery_milestones_map_to_ledger_statuses() {
        assert_eq!(
            TrackingStatus::for_delivery(DeliveryStatus::ParcelDelivered),
            Some(TrackingStatus::ParcelDelivered)
        );
        assert_eq!(TrackingStatus::for_delivery(DeliveryStatus::Created), None);
        assert_eq!(TrackingStatus::ParcelPaid.detail(), "parcel paid");
    }
}
