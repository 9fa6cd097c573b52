use super::{
    CheckoutProvider, CheckoutSession, NewCheckoutSession, ProviderPaymentState,
    SessionConfirmation,
};
use async_trait::async_trait;
use compact_str::CompactString;
use framework::Error;
use std::time::Duration;
use tracing::instrument;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe Checkout over the form-encoded v1 API.
#[derive(Clone)]
pub struct StripeCheckoutService {
    pub client: reqwest::Client,
    secret_key: CompactString,
    /// Base URL the customer is sent back to after paying.
    site_domain: String,
}

impl StripeCheckoutService {
    pub fn new(
        secret_key: impl Into<CompactString>,
        site_domain: impl Into<String>,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::BusinessPanic(e.into()))?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            site_domain: site_domain.into(),
        })
    }
}

/// Subset of Stripe's checkout session object the reconciler reads.
#[derive(Debug, serde::Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    payment_intent: Option<String>,
    payment_status: Option<String>,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    #[serde(default)]
    metadata: StripeMetadata,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct StripeMetadata {
    parcel_id: Option<String>,
    parcel_name: Option<String>,
    tracking_id: Option<String>,
}

#[async_trait]
impl CheckoutProvider for StripeCheckoutService {
    #[instrument(skip_all, err)]
    async fn create_session(&self, new: NewCheckoutSession) -> Result<CheckoutSession, Error> {
        let success_url = format!(
            "{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.site_domain
        );
        let cancel_url = format!("{}/payment-cancelled", self.site_domain);
        let amount = new.amount_minor.to_string();
        let parcel_id = new.parcel_id.to_string();
        let params = [
            ("mode", "payment"),
            ("success_url", &success_url),
            ("cancel_url", &cancel_url),
            ("customer_email", &new.customer_email),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", &new.currency),
            ("line_items[0][price_data][unit_amount]", &amount),
            (
                "line_items[0][price_data][product_data][name]",
                &new.parcel_name,
            ),
            ("metadata[parcelId]", &parcel_id),
            ("metadata[parcelName]", &new.parcel_name),
            ("metadata[trackingId]", &new.tracking_id),
        ];
        let response = self
            .client
            .post(CHECKOUT_SESSIONS_URL)
            .bearer_auth(self.secret_key.as_str())
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.into()))?;
        let session: StripeSession = read_session(response).await?;
        let redirect_url = session
            .url
            .ok_or_else(|| Error::Upstream(anyhow::anyhow!("checkout session has no url")))?;
        Ok(CheckoutSession {
            session_id: session.id,
            redirect_url,
        })
    }

    #[instrument(skip_all, err)]
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionConfirmation, Error> {
        let response = self
            .client
            .get(format!("{CHECKOUT_SESSIONS_URL}/{session_id}"))
            .bearer_auth(self.secret_key.as_str())
            .send()
            .await
            .map_err(|e| Error::Upstream(e.into()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }
        let session: StripeSession = read_session(response).await?;
        let state = if session.payment_status.as_deref() == Some("paid") {
            ProviderPaymentState::Paid
        } else {
            ProviderPaymentState::Unpaid
        };
        Ok(SessionConfirmation {
            session_id: session.id,
            transaction_id: session.payment_intent,
            state,
            amount_minor: session.amount_total,
            currency: session.currency,
            customer_email: session.customer_email,
            parcel_id: session.metadata.parcel_id,
            parcel_name: session.metadata.parcel_name,
            tracking_id: session.metadata.tracking_id,
        })
    }
}

async fn read_session(response: reqwest::Response) -> Result<StripeSession, Error> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Upstream(anyhow::anyhow!(
            "stripe returned {status}: {body}"
        )));
    }
    response
        .json()
        .await
        .map_err(|e| Error::DeserializeError(e.into()))
}
