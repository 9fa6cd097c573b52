use rust_decimal::Decimal;
use std::str::FromStr;
use time::PrimitiveDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_id: String,
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

    /// Declared delivery cost in major currency units.
    pub cost: Decimal,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentState,

    pub rider_id: Option<Uuid>,
    pub rider_email: Option<String>,
    pub rider_name: Option<String>,

    pub created_at: PrimitiveDateTime,
}

/// Lifecycle position of a parcel. Labels are part of the wire and
/// storage contract, including the dashed `pending-pickup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "delivery.delivery_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Created,
    #[sqlx(rename = "pending-pickup")]
    #[serde(rename = "pending-pickup")]
    PendingPickup,
    RiderAssigned,
    RiderArriving,
    ParcelDelivered,
}

impl DeliveryStatus {
    pub fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Created => "created",
            DeliveryStatus::PendingPickup => "pending-pickup",
            DeliveryStatus::RiderAssigned => "rider_assigned",
            DeliveryStatus::RiderArriving => "rider_arriving",
            DeliveryStatus::ParcelDelivered => "parcel_delivered",
        }
    }

    /// Forward edges reachable through a status update. Payment and rider
    /// assignment move the other edges; delivered is terminal.
    pub fn can_progress_to(self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::RiderAssigned, DeliveryStatus::RiderArriving)
                | (DeliveryStatus::RiderAssigned, DeliveryStatus::ParcelDelivered)
                | (DeliveryStatus::RiderArriving, DeliveryStatus::ParcelDelivered)
        )
    }

    /// States from which a rider may be (re)assigned.
    pub fn allows_rider_assignment(self) -> bool {
        matches!(
            self,
            DeliveryStatus::PendingPickup
                | DeliveryStatus::RiderAssigned
                | DeliveryStatus::RiderArriving
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::ParcelDelivered)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DeliveryStatus {
    type Err = framework::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(DeliveryStatus::Created),
            "pending-pickup" => Ok(DeliveryStatus::PendingPickup),
            "rider_assigned" => Ok(DeliveryStatus::RiderAssigned),
            "rider_arriving" => Ok(DeliveryStatus::RiderArriving),
            "parcel_delivered" => Ok(DeliveryStatus::ParcelDelivered),
            _ => Err(framework::Error::InvalidInput),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "delivery.payment_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Unpaid,
    Paid,
}
