pub mod checkout;
pub mod parcel_flow;
pub mod queries;
pub mod rider_registry;
pub mod sweep;
pub mod tracking_ledger;

pub use checkout::CheckoutService;
pub use parcel_flow::ParcelFlowService;
pub use queries::QueryService;
pub use rider_registry::RiderRegistryService;
pub use sweep::ConsistencySweep;
pub use tracking_ledger::TrackingLedgerService;
