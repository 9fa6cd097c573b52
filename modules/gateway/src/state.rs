use crate::config::Config;
use async_trait::async_trait;
use dispatch::providers::{
    CheckoutProvider, CheckoutSession, NewCheckoutSession, SessionConfirmation,
    StripeCheckoutService,
};
use dispatch::rpc::DispatchState;
use dispatch::services::{
    CheckoutService, ConsistencySweep, ParcelFlowService, QueryService, RiderRegistryService,
    TrackingLedgerService,
};
use dispatch::storage::{
    MemoryParcelStore, MemoryPaymentStore, MemoryRiderStore, MemoryTrackingStore, ParcelStore,
    PaymentStore, PgParcelStore, PgPaymentStore, PgRiderStore, PgTrackingStore, RiderStore,
    TrackingStore,
};
use framework::sqlx::Database;
use identity::rpc::users::IdentityState;
use identity::services::directory::UserDirectoryService;
use identity::storage::{MemoryUserStore, PgUserStore, UserStore};
use std::sync::Arc;

/// One handle per collection. Selection happens here; everything
/// downstream only sees the trait objects.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub parcels: Arc<dyn ParcelStore>,
    pub riders: Arc<dyn RiderStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub trackings: Arc<dyn TrackingStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            parcels: Arc::new(MemoryParcelStore::new()),
            riders: Arc::new(MemoryRiderStore::new()),
            payments: Arc::new(MemoryPaymentStore::new()),
            trackings: Arc::new(MemoryTrackingStore::new()),
        }
    }

    /// Connects, applies pending migrations, and hands out stores over a
    /// shared pool.
    pub async fn postgres(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = Database::connect(url, max_connections).await?;
        sqlx::migrate!().run(db.db()).await?;
        Ok(Self {
            users: Arc::new(PgUserStore::new(db.clone())),
            parcels: Arc::new(PgParcelStore::new(db.clone())),
            riders: Arc::new(PgRiderStore::new(db.clone())),
            payments: Arc::new(PgPaymentStore::new(db.clone())),
            trackings: Arc::new(PgTrackingStore::new(db)),
        })
    }
}

/// Everything the router and the background sweep run on, assembled once
/// at startup.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityState,
    pub dispatch: DispatchState,
    pub sweep: ConsistencySweep,
}

impl AppState {
    pub fn assemble(
        config: &Config,
        stores: &Stores,
        provider: Arc<dyn CheckoutProvider>,
    ) -> Self {
        let directory = UserDirectoryService {
            users: Arc::clone(&stores.users),
        };
        let ledger = TrackingLedgerService::new(Arc::clone(&stores.trackings));

        let parcel_flow = ParcelFlowService {
            parcels: Arc::clone(&stores.parcels),
            riders: Arc::clone(&stores.riders),
            ledger: ledger.clone(),
            tracking: config.tracking.clone(),
        };
        let checkout = CheckoutService {
            parcels: Arc::clone(&stores.parcels),
            payments: Arc::clone(&stores.payments),
            provider,
            ledger: ledger.clone(),
            config: config.checkout.clone(),
        };
        let registry = RiderRegistryService {
            riders: Arc::clone(&stores.riders),
            directory: directory.clone(),
        };
        let queries = QueryService {
            parcels: Arc::clone(&stores.parcels),
            riders: Arc::clone(&stores.riders),
            payments: Arc::clone(&stores.payments),
        };
        let sweep = ConsistencySweep {
            parcels: Arc::clone(&stores.parcels),
            riders: Arc::clone(&stores.riders),
            payments: Arc::clone(&stores.payments),
            ledger: ledger.clone(),
            payment_window: config.sweep_payment_window,
        };

        Self {
            identity: IdentityState { directory },
            dispatch: DispatchState {
                parcel_flow,
                checkout,
                registry,
                ledger,
                queries,
            },
            sweep,
        }
    }
}

/// Picks the configured payment provider, or a stand-in that rejects
/// checkout calls until a key is supplied.
pub fn checkout_provider(config: &Config) -> Result<Arc<dyn CheckoutProvider>, framework::Error> {
    match &config.stripe_secret_key {
        Some(key) => {
            let stripe = StripeCheckoutService::new(key.as_str(), config.site_domain.clone())?;
            Ok(Arc::new(stripe))
        }
        None => {
            tracing::warn!(
                "PARCEL_STRIPE_SECRET_KEY is not set; checkout endpoints will return errors"
            );
            Ok(Arc::new(DisabledCheckout))
        }
    }
}

struct DisabledCheckout;

#[async_trait]
impl CheckoutProvider for DisabledCheckout {
    async fn create_session(
        &self,
        _new: NewCheckoutSession,
    ) -> Result<CheckoutSession, framework::Error> {
        Err(framework::Error::Upstream(anyhow::anyhow!(
            "no payment provider is configured"
        )))
    }

    async fn retrieve_session(
        &self,
        _session_id: &str,
    ) -> Result<SessionConfirmation, framework::Error> {
        Err(framework::Error::Upstream(anyhow::anyhow!(
            "no payment provider is configured"
        )))
    }
}
