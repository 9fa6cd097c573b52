use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use uuid::Uuid;

/// One reconciled provider payment. `transaction_id` is unique at the
/// storage level, which is what makes reconciliation at-most-once.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub parcel_id: Uuid,
    pub tracking_id: String,
    pub transaction_id: String,

    /// Settled amount in major currency units.
    pub amount: Decimal,
    pub currency: String,
    pub customer_email: Option<String>,
    pub parcel_name: String,

    pub paid_at: PrimitiveDateTime,
}
