use async_trait::async_trait;
use uuid::Uuid;

pub mod stripe;

pub use stripe::StripeCheckoutService;

/// What the reconciler needs to open a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckoutSession {
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    pub currency: String,
    pub parcel_id: Uuid,
    pub parcel_name: String,
    pub tracking_id: String,
    pub customer_email: String,
}

/// Hand-off to the provider's hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPaymentState {
    Paid,
    Unpaid,
}

/// Provider-confirmed view of a session, echoing back the metadata the
/// session was created with. Everything optional is provider-dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfirmation {
    pub session_id: String,
    /// The provider's settlement id; the reconciliation key.
    pub transaction_id: Option<String>,
    pub state: ProviderPaymentState,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub parcel_id: Option<String>,
    pub parcel_name: Option<String>,
    pub tracking_id: Option<String>,
}

/// External payment provider. The rest of the crate only sees this
/// trait, so tests can settle sessions without a network.
#[async_trait]
pub trait CheckoutProvider: Send + Sync + 'static {
    async fn create_session(
        &self,
        new: NewCheckoutSession,
    ) -> Result<CheckoutSession, framework::Error>;

    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<SessionConfirmation, framework::Error>;
}
