use crate::config::CheckoutConfig;
use crate::entities::{PaymentRecord, TrackingStatus};
use crate::providers::{CheckoutProvider, CheckoutSession, NewCheckoutSession, ProviderPaymentState};
use crate::services::tracking_ledger::TrackingLedgerService;
use crate::storage::{ParcelStore, PaymentInsertOutcome, PaymentStore};
use framework::{Error, Processor};
use identity::services::verifier::Caller;
use identity::utils::rbac;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Creates provider checkout sessions and reconciles their outcomes.
///
/// Reconciliation is keyed on the provider transaction id and the
/// payment table's unique gate, so confirming the same settled session
/// any number of times records exactly one payment.
#[derive(Clone)]
pub struct CheckoutService {
    pub parcels: Arc<dyn ParcelStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub provider: Arc<dyn CheckoutProvider>,
    pub ledger: TrackingLedgerService,
    pub config: CheckoutConfig,
}

#[derive(Debug, Clone)]
pub struct CreateCheckoutIntent {
    pub caller: Caller,
    pub parcel_id: Uuid,
    /// Charge amount in major currency units.
    pub amount: Decimal,
    pub parcel_name: String,
    pub sender_email: String,
    pub tracking_id: String,
}

impl Processor<CreateCheckoutIntent> for CheckoutService {
    type Output = CheckoutSession;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: CreateCheckoutIntent) -> Result<CheckoutSession, Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.sender_email)?;
        let parcel = self
            .parcels
            .find(input.parcel_id)
            .await?
            .ok_or(Error::NotFound)?;
        if input.tracking_id != parcel.tracking_id {
            return Err(Error::InvalidInput);
        }
        if input.amount <= Decimal::ZERO {
            return Err(Error::InvalidInput);
        }
        let amount_minor = (input.amount * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .ok_or(Error::InvalidInput)?;

        self.provider
            .create_session(NewCheckoutSession {
                amount_minor,
                currency: self.config.currency.to_string(),
                parcel_id: parcel.id,
                parcel_name: input.parcel_name,
                tracking_id: parcel.tracking_id,
                customer_email: input.sender_email,
            })
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmCheckoutSession {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This call recorded the payment and moved the parcel forward.
    Reconciled {
        transaction_id: String,
        tracking_id: String,
    },
    /// The transaction was already recorded by an earlier confirmation.
    AlreadyReconciled {
        transaction_id: String,
        tracking_id: String,
    },
    /// The provider has not settled the session; nothing was written.
    NotSettled,
}

impl Processor<ConfirmCheckoutSession> for CheckoutService {
    type Output = ReconcileOutcome;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ConfirmCheckoutSession) -> Result<ReconcileOutcome, Error> {
        let confirmation = self.provider.retrieve_session(&input.session_id).await?;
        if confirmation.state != ProviderPaymentState::Paid {
            return Ok(ReconcileOutcome::NotSettled);
        }
        let transaction_id = confirmation.transaction_id.ok_or_else(|| {
            Error::Upstream(anyhow::anyhow!("paid session carries no transaction id"))
        })?;

        // Fast path: this transaction was already reconciled.
        if let Some(existing) = self.payments.find_by_transaction_id(&transaction_id).await? {
            return Ok(ReconcileOutcome::AlreadyReconciled {
                transaction_id,
                tracking_id: existing.tracking_id,
            });
        }

        let parcel_id = confirmation
            .parcel_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(Error::InvalidInput)?;
        let parcel = self.parcels.find(parcel_id).await?;
        let tracking_id = confirmation
            .tracking_id
            .or_else(|| parcel.as_ref().map(|p| p.tracking_id.clone()))
            .ok_or(Error::InvalidInput)?;
        let parcel_name = confirmation
            .parcel_name
            .or_else(|| parcel.as_ref().map(|p| p.title.clone()))
            .unwrap_or_default();
        let amount_minor = confirmation.amount_minor.ok_or_else(|| {
            Error::Upstream(anyhow::anyhow!("paid session carries no settled amount"))
        })?;

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            parcel_id,
            tracking_id: tracking_id.clone(),
            transaction_id: transaction_id.clone(),
            amount: Decimal::new(amount_minor, 2),
            currency: confirmation
                .currency
                .unwrap_or_else(|| self.config.currency.to_string()),
            customer_email: confirmation.customer_email,
            parcel_name,
            paid_at: framework::now_time(),
        };

        // The unique gate decides the winner under concurrent confirms.
        if self.payments.insert_unique(record).await?
            == PaymentInsertOutcome::DuplicateTransaction
        {
            return Ok(ReconcileOutcome::AlreadyReconciled {
                transaction_id,
                tracking_id,
            });
        }

        match self.parcels.mark_paid(parcel_id).await? {
            Some(_) => {}
            None => warn!(
                parcel = %parcel_id,
                "payment recorded for a parcel that is missing or already moved"
            ),
        }
        if let Err(e) = self.ledger.append(&tracking_id, TrackingStatus::ParcelPaid).await {
            // The sweep backfills missing payment milestones.
            error!(%tracking_id, "payment event lost: {e}");
        }

        Ok(ReconcileOutcome::Reconciled {
            transaction_id,
            tracking_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;
    use crate::entities::{DeliveryStatus, Parcel, PaymentState};
    use crate::providers::SessionConfirmation;
    use crate::services::parcel_flow::{CreateParcel, NewParcel, ParcelFlowService};
    use crate::storage::{
        MemoryParcelStore, MemoryPaymentStore, MemoryRiderStore, MemoryTrackingStore,
    };
    use async_trait::async_trait;
    use identity::entities::user_account::Role;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        sessions: HashMap<String, SessionConfirmation>,
        last_request: Mutex<Option<NewCheckoutSession>>,
    }

    #[async_trait]
    impl CheckoutProvider for FakeProvider {
        async fn create_session(
            &self,
            new: NewCheckoutSession,
        ) -> Result<CheckoutSession, Error> {
            if let Ok(mut last) = self.last_request.lock() {
                *last = Some(new);
            }
            Ok(CheckoutSession {
                session_id: "cs_test".into(),
                redirect_url: "https://pay.example/cs_test".into(),
            })
        }

        async fn retrieve_session(&self, session_id: &str) -> Result<SessionConfirmation, Error> {
            self.sessions
                .get(session_id)
                .cloned()
                .ok_or(Error::NotFound)
        }
    }

    fn paid_session(session_id: &str, transaction_id: &str, parcel: &Parcel) -> SessionConfirmation {
        SessionConfirmation {
            session_id: session_id.into(),
            transaction_id: Some(transaction_id.into()),
            state: ProviderPaymentState::Paid,
            amount_minor: Some(12050),
            currency: Some("usd".into()),
            customer_email: Some(parcel.sender_email.clone()),
            parcel_id: Some(parcel.id.to_string()),
            parcel_name: Some(parcel.title.clone()),
            tracking_id: Some(parcel.tracking_id.clone()),
        }
    }

    struct Fixture {
        flow: ParcelFlowService,
        payments: Arc<MemoryPaymentStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                flow: ParcelFlowService {
                    parcels: Arc::new(MemoryParcelStore::new()),
                    riders: Arc::new(MemoryRiderStore::new()),
                    ledger: TrackingLedgerService::new(Arc::new(MemoryTrackingStore::new())),
                    tracking: TrackingConfig::default(),
                },
                payments: Arc::new(MemoryPaymentStore::new()),
            }
        }

        fn checkout(&self, provider: Arc<FakeProvider>) -> CheckoutService {
            CheckoutService {
                parcels: self.flow.parcels.clone(),
                payments: self.payments.clone(),
                provider,
                ledger: self.flow.ledger.clone(),
                config: CheckoutConfig::default(),
            }
        }

        async fn create_parcel(&self) -> Result<Parcel, Error> {
            let outcome = self
                .flow
                .process(CreateParcel {
                    caller: Caller::new("alice@example.com", Role::User),
                    details: NewParcel {
                        title: "Books".into(),
                        sender_name: "Alice".into(),
                        sender_email: "alice@example.com".into(),
                        sender_region: "Dhaka".into(),
                        sender_district: "Gulshan".into(),
                        sender_address: "House 1".into(),
                        sender_contact: "01700000001".into(),
                        receiver_name: "Bob".into(),
                        receiver_region: "Chattogram".into(),
                        receiver_district: "Pahartali".into(),
                        receiver_address: "House 9".into(),
                        receiver_contact: "01700000002".into(),
                        cost: Decimal::new(12050, 2),
                    },
                })
                .await?;
            Ok(outcome.parcel)
        }
    }

    #[tokio::test]
    async fn intent_converts_the_amount_to_minor_units() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let parcel = fixture.create_parcel().await?;
        let provider = Arc::new(FakeProvider::default());
        let checkout = fixture.checkout(provider.clone());

        let session = checkout
            .process(CreateCheckoutIntent {
                caller: Caller::new("alice@example.com", Role::User),
                parcel_id: parcel.id,
                amount: parcel.cost,
                parcel_name: parcel.title.clone(),
                sender_email: parcel.sender_email.clone(),
                tracking_id: parcel.tracking_id.clone(),
            })
            .await?;
        assert_eq!(session.session_id, "cs_test");

        let request = provider
            .last_request
            .lock()
            .ok()
            .and_then(|l| l.clone())
            .ok_or_else(|| anyhow::anyhow!("no session request captured"))?;
        assert_eq!(request.amount_minor, 12050);
        assert_eq!(request.tracking_id, parcel.tracking_id);
        Ok(())
    }

    #[tokio::test]
    async fn intent_rejects_foreign_callers_and_zero_amounts() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let parcel = fixture.create_parcel().await?;
        let checkout = fixture.checkout(Arc::new(FakeProvider::default()));

        let foreign = checkout
            .process(CreateCheckoutIntent {
                caller: Caller::new("mallory@example.com", Role::User),
                parcel_id: parcel.id,
                amount: parcel.cost,
                parcel_name: parcel.title.clone(),
                sender_email: parcel.sender_email.clone(),
                tracking_id: parcel.tracking_id.clone(),
            })
            .await;
        assert!(matches!(foreign, Err(Error::PermissionsDenied)));

        let zero = checkout
            .process(CreateCheckoutIntent {
                caller: Caller::new("alice@example.com", Role::User),
                parcel_id: parcel.id,
                amount: Decimal::ZERO,
                parcel_name: parcel.title.clone(),
                sender_email: parcel.sender_email.clone(),
                tracking_id: parcel.tracking_id.clone(),
            })
            .await;
        assert!(matches!(zero, Err(Error::InvalidInput)));
        Ok(())
    }

    #[tokio::test]
    async fn settled_sessions_reconcile_exactly_once() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let parcel = fixture.create_parcel().await?;
        let mut provider = FakeProvider::default();
        provider
            .sessions
            .insert("cs_1".into(), paid_session("cs_1", "pi_123", &parcel));
        let checkout = fixture.checkout(Arc::new(provider));

        let first = checkout
            .process(ConfirmCheckoutSession {
                session_id: "cs_1".into(),
            })
            .await?;
        let ReconcileOutcome::Reconciled { tracking_id, .. } = first else {
            anyhow::bail!("expected a fresh reconciliation, got {first:?}");
        };
        assert_eq!(tracking_id, parcel.tracking_id);

        let replay = checkout
            .process(ConfirmCheckoutSession {
                session_id: "cs_1".into(),
            })
            .await?;
        let ReconcileOutcome::AlreadyReconciled {
            tracking_id: replayed,
            ..
        } = replay
        else {
            anyhow::bail!("expected a replay, got {replay:?}");
        };
        assert_eq!(replayed, parcel.tracking_id);

        let stored = checkout
            .payments
            .find_by_transaction_id("pi_123")
            .await?
            .ok_or_else(|| anyhow::anyhow!("payment missing"))?;
        assert_eq!(stored.amount, Decimal::new(12050, 2));

        let updated = checkout
            .parcels
            .find(parcel.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("parcel missing"))?;
        assert_eq!(updated.payment_status, PaymentState::Paid);
        assert_eq!(updated.delivery_status, DeliveryStatus::PendingPickup);
        Ok(())
    }

    #[tokio::test]
    async fn unsettled_sessions_write_nothing() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let parcel = fixture.create_parcel().await?;
        let mut session = paid_session("cs_1", "pi_123", &parcel);
        session.state = ProviderPaymentState::Unpaid;
        session.transaction_id = None;
        let mut provider = FakeProvider::default();
        provider.sessions.insert("cs_1".into(), session);
        let checkout = fixture.checkout(Arc::new(provider));

        let outcome = checkout
            .process(ConfirmCheckoutSession {
                session_id: "cs_1".into(),
            })
            .await?;
        assert_eq!(outcome, ReconcileOutcome::NotSettled);

        let untouched = checkout
            .parcels
            .find(parcel.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("parcel missing"))?;
        assert_eq!(untouched.payment_status, PaymentState::Unpaid);
        assert_eq!(untouched.delivery_status, DeliveryStatus::Created);
        assert!(checkout
            .payments
            .find_by_transaction_id("pi_123")
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn payment_for_a_deleted_parcel_is_still_recorded() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let parcel = fixture.create_parcel().await?;
        let mut provider = FakeProvider::default();
        provider
            .sessions
            .insert("cs_1".into(), paid_session("cs_1", "pi_123", &parcel));
        let checkout = fixture.checkout(Arc::new(provider));
        checkout.parcels.delete(parcel.id).await?;

        let outcome = checkout
            .process(ConfirmCheckoutSession {
                session_id: "cs_1".into(),
            })
            .await?;
        assert!(matches!(outcome, ReconcileOutcome::Reconciled { .. }));
        assert!(checkout
            .payments
            .find_by_transaction_id("pi_123")
            .await?
            .is_some());
        Ok(())
    }
}
