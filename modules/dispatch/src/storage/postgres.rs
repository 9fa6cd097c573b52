use super::{
    ParcelFilter, ParcelStore, PaymentInsertOutcome, PaymentStore, RiderFilter, RiderStore,
    TrackingStore,
};
use crate::entities::{
    ApprovalStatus, DeliveryStatus, Parcel, PaymentRecord, PaymentState, Rider, TrackingEvent,
    TrackingStatus, WorkStatus,
};
use async_trait::async_trait;
use framework::sqlx::Database;
use framework::Error;
use time::PrimitiveDateTime;
use tracing::instrument;
use uuid::Uuid;

const PARCEL_COLUMNS: &str = "id, tracking_id, title, \
    sender_name, sender_email, sender_region, sender_district, sender_address, sender_contact, \
    receiver_name, receiver_region, receiver_district, receiver_address, receiver_contact, \
    cost, delivery_status, payment_status, rider_id, rider_email, rider_name, created_at";

const RIDER_COLUMNS: &str =
    "id, name, email, phone, region, district, bike_registration, status, work_status, created_at";

const PAYMENT_COLUMNS: &str = "id, parcel_id, tracking_id, transaction_id, amount, currency, \
    customer_email, parcel_name, paid_at";

const TRACKING_COLUMNS: &str = "id, tracking_id, status, detail, created_at";

#[derive(Clone)]
pub struct PgParcelStore {
    db: Database,
}

impl PgParcelStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ParcelStore for PgParcelStore {
    #[instrument(skip_all, name = "SQL:InsertParcel", err)]
    async fn insert(&self, parcel: Parcel) -> Result<(), Error> {
        let sql = format!(
            r#"INSERT INTO "delivery"."parcel" ({PARCEL_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"#
        );
        sqlx::query(&sql)
            .bind(parcel.id)
            .bind(&parcel.tracking_id)
            .bind(&parcel.title)
            .bind(&parcel.sender_name)
            .bind(&parcel.sender_email)
            .bind(&parcel.sender_region)
            .bind(&parcel.sender_district)
            .bind(&parcel.sender_address)
            .bind(&parcel.sender_contact)
            .bind(&parcel.receiver_name)
            .bind(&parcel.receiver_region)
            .bind(&parcel.receiver_district)
            .bind(&parcel.receiver_address)
            .bind(&parcel.receiver_contact)
            .bind(parcel.cost)
            .bind(parcel.delivery_status)
            .bind(parcel.payment_status)
            .bind(parcel.rider_id)
            .bind(&parcel.rider_email)
            .bind(&parcel.rider_name)
            .bind(parcel.created_at)
            .execute(self.db.db())
            .await?;
        Ok(())
    }

    #[instrument(skip_all, name = "SQL:FindParcelById", err)]
    async fn find(&self, id: Uuid) -> Result<Option<Parcel>, Error> {
        let sql = format!(r#"SELECT {PARCEL_COLUMNS} FROM "delivery"."parcel" WHERE id = $1"#);
        let parcel = sqlx::query_as::<_, Parcel>(&sql)
            .bind(id)
            .fetch_optional(self.db.db())
            .await?;
        Ok(parcel)
    }

    #[instrument(skip_all, name = "SQL:ListParcels", err)]
    async fn list(&self, filter: ParcelFilter) -> Result<Vec<Parcel>, Error> {
        let mut query = sqlx::QueryBuilder::new(format!(
            r#"SELECT {PARCEL_COLUMNS} FROM "delivery"."parcel" WHERE TRUE"#
        ));
        if let Some(email) = &filter.sender_email {
            query.push(" AND sender_email = ").push_bind(email);
        }
        if let Some(status) = filter.delivery_status {
            query.push(" AND delivery_status = ").push_bind(status);
        }
        query.push(" ORDER BY created_at DESC");
        let parcels = query
            .build_query_as::<Parcel>()
            .fetch_all(self.db.db())
            .await?;
        Ok(parcels)
    }

    #[instrument(skip_all, name = "SQL:ListParcelsForRider", err)]
    async fn list_for_rider(
        &self,
        rider_email: &str,
        exclude_delivered: bool,
    ) -> Result<Vec<Parcel>, Error> {
        let comparator = if exclude_delivered { "<>" } else { "=" };
        let sql = format!(
            r#"SELECT {PARCEL_COLUMNS} FROM "delivery"."parcel"
            WHERE rider_email = $1 AND delivery_status {comparator} $2
            ORDER BY created_at DESC"#
        );
        let parcels = sqlx::query_as::<_, Parcel>(&sql)
            .bind(rider_email)
            .bind(DeliveryStatus::ParcelDelivered)
            .fetch_all(self.db.db())
            .await?;
        Ok(parcels)
    }

    #[instrument(skip_all, name = "SQL:AssignParcelRider", err)]
    async fn assign_rider(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        rider: &Rider,
    ) -> Result<Parcel, Error> {
        let sql = format!(
            r#"UPDATE "delivery"."parcel"
            SET delivery_status = $3, rider_id = $4, rider_email = $5, rider_name = $6
            WHERE id = $1 AND delivery_status = $2
            RETURNING {PARCEL_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Parcel>(&sql)
            .bind(id)
            .bind(expected)
            .bind(DeliveryStatus::RiderAssigned)
            .bind(rider.id)
            .bind(&rider.email)
            .bind(&rider.name)
            .fetch_optional(self.db.db())
            .await?;
        match updated {
            Some(parcel) => Ok(parcel),
            // Zero rows: either the parcel is gone or the status moved.
            None => match self.find(id).await? {
                Some(_) => Err(Error::Conflict),
                None => Err(Error::NotFound),
            },
        }
    }

    #[instrument(skip_all, name = "SQL:SetParcelDeliveryStatus", err)]
    async fn set_delivery_status(
        &self,
        id: Uuid,
        expected: DeliveryStatus,
        next: DeliveryStatus,
    ) -> Result<Parcel, Error> {
        let sql = format!(
            r#"UPDATE "delivery"."parcel" SET delivery_status = $3
            WHERE id = $1 AND delivery_status = $2
            RETURNING {PARCEL_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Parcel>(&sql)
            .bind(id)
            .bind(expected)
            .bind(next)
            .fetch_optional(self.db.db())
            .await?;
        match updated {
            Some(parcel) => Ok(parcel),
            None => match self.find(id).await? {
                Some(_) => Err(Error::Conflict),
                None => Err(Error::NotFound),
            },
        }
    }

    #[instrument(skip_all, name = "SQL:MarkParcelPaid", err)]
    async fn mark_paid(&self, id: Uuid) -> Result<Option<Parcel>, Error> {
        let sql = format!(
            r#"UPDATE "delivery"."parcel" SET payment_status = $2, delivery_status = $3
            WHERE id = $1 AND payment_status = $4 AND delivery_status = $5
            RETURNING {PARCEL_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Parcel>(&sql)
            .bind(id)
            .bind(PaymentState::Paid)
            .bind(DeliveryStatus::PendingPickup)
            .bind(PaymentState::Unpaid)
            .bind(DeliveryStatus::Created)
            .fetch_optional(self.db.db())
            .await?;
        Ok(updated)
    }

    #[instrument(skip_all, name = "SQL:DeleteParcel", err)]
    async fn delete(&self, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(r#"DELETE FROM "delivery"."parcel" WHERE id = $1"#)
            .bind(id)
            .execute(self.db.db())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgRiderStore {
    db: Database,
}

impl PgRiderStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RiderStore for PgRiderStore {
    #[instrument(skip_all, name = "SQL:InsertRider", err)]
    async fn insert(&self, rider: Rider) -> Result<(), Error> {
        let sql = format!(
            r#"INSERT INTO "delivery"."rider" ({RIDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#
        );
        sqlx::query(&sql)
            .bind(rider.id)
            .bind(&rider.name)
            .bind(&rider.email)
            .bind(&rider.phone)
            .bind(&rider.region)
            .bind(&rider.district)
            .bind(&rider.bike_registration)
            .bind(rider.status)
            .bind(rider.work_status)
            .bind(rider.created_at)
            .execute(self.db.db())
            .await?;
        Ok(())
    }

    #[instrument(skip_all, name = "SQL:FindRiderById", err)]
    async fn find(&self, id: Uuid) -> Result<Option<Rider>, Error> {
        let sql = format!(r#"SELECT {RIDER_COLUMNS} FROM "delivery"."rider" WHERE id = $1"#);
        let rider = sqlx::query_as::<_, Rider>(&sql)
            .bind(id)
            .fetch_optional(self.db.db())
            .await?;
        Ok(rider)
    }

    #[instrument(skip_all, name = "SQL:ListRiders", err)]
    async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, Error> {
        let mut query = sqlx::QueryBuilder::new(format!(
            r#"SELECT {RIDER_COLUMNS} FROM "delivery"."rider" WHERE TRUE"#
        ));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(district) = &filter.district {
            query.push(" AND district = ").push_bind(district);
        }
        if let Some(work_status) = filter.work_status {
            query.push(" AND work_status = ").push_bind(work_status);
        }
        query.push(" ORDER BY created_at DESC");
        let riders = query
            .build_query_as::<Rider>()
            .fetch_all(self.db.db())
            .await?;
        Ok(riders)
    }

    #[instrument(skip_all, name = "SQL:SetRiderWorkStatus", err)]
    async fn set_work_status(&self, id: Uuid, status: WorkStatus) -> Result<Rider, Error> {
        let sql = format!(
            r#"UPDATE "delivery"."rider" SET work_status = $2 WHERE id = $1
            RETURNING {RIDER_COLUMNS}"#
        );
        let rider = sqlx::query_as::<_, Rider>(&sql)
            .bind(id)
            .bind(status)
            .fetch_one(self.db.db())
            .await?;
        Ok(rider)
    }

    #[instrument(skip_all, name = "SQL:ReviewRider", err)]
    async fn review(&self, id: Uuid, status: ApprovalStatus) -> Result<Rider, Error> {
        let sql = format!(
            r#"UPDATE "delivery"."rider" SET status = $2, work_status = $3 WHERE id = $1
            RETURNING {RIDER_COLUMNS}"#
        );
        let rider = sqlx::query_as::<_, Rider>(&sql)
            .bind(id)
            .bind(status)
            .bind(WorkStatus::Available)
            .fetch_one(self.db.db())
            .await?;
        Ok(rider)
    }
}

#[derive(Clone)]
pub struct PgPaymentStore {
    db: Database,
}

impl PgPaymentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    #[instrument(skip_all, name = "SQL:InsertPayment", err)]
    async fn insert_unique(&self, payment: PaymentRecord) -> Result<PaymentInsertOutcome, Error> {
        let sql = format!(
            r#"INSERT INTO "delivery"."payment" ({PAYMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (transaction_id) DO NOTHING"#
        );
        let result = sqlx::query(&sql)
            .bind(payment.id)
            .bind(payment.parcel_id)
            .bind(&payment.tracking_id)
            .bind(&payment.transaction_id)
            .bind(payment.amount)
            .bind(&payment.currency)
            .bind(&payment.customer_email)
            .bind(&payment.parcel_name)
            .bind(payment.paid_at)
            .execute(self.db.db())
            .await?;
        if result.rows_affected() == 0 {
            return Ok(PaymentInsertOutcome::DuplicateTransaction);
        }
        Ok(PaymentInsertOutcome::Inserted)
    }

    #[instrument(skip_all, name = "SQL:FindPaymentByTransactionId", err)]
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, Error> {
        let sql = format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM "delivery"."payment" WHERE transaction_id = $1"#
        );
        let payment = sqlx::query_as::<_, PaymentRecord>(&sql)
            .bind(transaction_id)
            .fetch_optional(self.db.db())
            .await?;
        Ok(payment)
    }

    #[instrument(skip_all, name = "SQL:ListPaymentsByCustomer", err)]
    async fn list_by_customer(&self, email: &str) -> Result<Vec<PaymentRecord>, Error> {
        let sql = format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM "delivery"."payment"
            WHERE customer_email = $1 ORDER BY paid_at DESC"#
        );
        let payments = sqlx::query_as::<_, PaymentRecord>(&sql)
            .bind(email)
            .fetch_all(self.db.db())
            .await?;
        Ok(payments)
    }

    #[instrument(skip_all, name = "SQL:ListRecentPayments", err)]
    async fn list_recent(&self, limit: i64) -> Result<Vec<PaymentRecord>, Error> {
        let sql = format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM "delivery"."payment"
            ORDER BY paid_at DESC LIMIT $1"#
        );
        let payments = sqlx::query_as::<_, PaymentRecord>(&sql)
            .bind(limit)
            .fetch_all(self.db.db())
            .await?;
        Ok(payments)
    }
}

#[derive(Clone)]
pub struct PgTrackingStore {
    db: Database,
}

impl PgTrackingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TrackingStore for PgTrackingStore {
    #[instrument(skip_all, name = "SQL:AppendTrackingEvent", err)]
    async fn append(
        &self,
        tracking_id: &str,
        status: TrackingStatus,
        detail: &str,
        at: PrimitiveDateTime,
    ) -> Result<TrackingEvent, Error> {
        let sql = format!(
            r#"INSERT INTO "delivery"."tracking_event" (tracking_id, status, detail, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {TRACKING_COLUMNS}"#
        );
        let event = sqlx::query_as::<_, TrackingEvent>(&sql)
            .bind(tracking_id)
            .bind(status)
            .bind(detail)
            .bind(at)
            .fetch_one(self.db.db())
            .await?;
        Ok(event)
    }

    #[instrument(skip_all, name = "SQL:TrackingHistory", err)]
    async fn history(&self, tracking_id: &str) -> Result<Vec<TrackingEvent>, Error> {
        let sql = format!(
            r#"SELECT {TRACKING_COLUMNS} FROM "delivery"."tracking_event"
            WHERE tracking_id = $1 ORDER BY created_at, id"#
        );
        let events = sqlx::query_as::<_, TrackingEvent>(&sql)
            .bind(tracking_id)
            .fetch_all(self.db.db())
            .await?;
        Ok(events)
    }

    #[instrument(skip_all, name = "SQL:HasTrackingEvent", err)]
    async fn has_event(&self, tracking_id: &str, status: TrackingStatus) -> Result<bool, Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                SELECT 1 FROM "delivery"."tracking_event" WHERE tracking_id = $1 AND status = $2
            )"#,
        )
        .bind(tracking_id)
        .bind(status)
        .fetch_one(self.db.db())
        .await?;
        Ok(exists)
    }
}
