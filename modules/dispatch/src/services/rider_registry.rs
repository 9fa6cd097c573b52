use crate::entities::{ApprovalStatus, Rider, WorkStatus};
use crate::storage::RiderStore;
use framework::{Error, Processor};
use identity::services::directory::{PromoteToRider, UserDirectoryService};
use identity::services::verifier::Caller;
use identity::utils::rbac;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Rider onboarding: applications come in pending and an admin settles
/// them. Approval also promotes the matching user account to the rider
/// role through the user directory.
#[derive(Clone)]
pub struct RiderRegistryService {
    pub riders: Arc<dyn RiderStore>,
    pub directory: UserDirectoryService,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRider {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub region: String,
    pub district: String,
    pub bike_registration: String,
}

#[derive(Debug, Clone)]
pub struct CreateRiderApplication {
    pub caller: Caller,
    pub details: NewRider,
}

impl Processor<CreateRiderApplication> for RiderRegistryService {
    type Output = Rider;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: CreateRiderApplication) -> Result<Rider, Error> {
        rbac::ensure_self_or_admin(&input.caller, &input.details.email)?;
        let rider = Rider {
            id: Uuid::new_v4(),
            name: input.details.name,
            email: input.details.email,
            phone: input.details.phone,
            region: input.details.region,
            district: input.details.district,
            bike_registration: input.details.bike_registration,
            status: ApprovalStatus::Pending,
            work_status: WorkStatus::Available,
            created_at: framework::now_time(),
        };
        self.riders.insert(rider.clone()).await?;
        Ok(rider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ReviewRiderApplication {
    pub caller: Caller,
    pub rider_id: Uuid,
    pub decision: ReviewDecision,
}

impl Processor<ReviewRiderApplication> for RiderRegistryService {
    type Output = Rider;
    type Error = Error;

    #[instrument(skip_all, err)]
    async fn process(&self, input: ReviewRiderApplication) -> Result<Rider, Error> {
        rbac::ensure_admin(&input.caller)?;
        let rider = self
            .riders
            .find(input.rider_id)
            .await?
            .ok_or(Error::NotFound)?;
        let status = match input.decision {
            ReviewDecision::Approved => {
                // Promote the account first: a rider record marked
                // approved without the role would pass assignment checks
                // while the person still cannot act as a rider.
                self.directory
                    .process(PromoteToRider {
                        email: rider.email.clone(),
                    })
                    .await?;
                ApprovalStatus::Approved
            }
            ReviewDecision::Rejected => ApprovalStatus::Rejected,
        };
        self.riders.review(rider.id, status).await
    }
}
