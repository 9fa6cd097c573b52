pub mod parcel;
pub mod payment;
pub mod rider;
pub mod tracking;

pub use parcel::{DeliveryStatus, Parcel, PaymentState};
pub use payment::PaymentRecord;
pub use rider::{ApprovalStatus, Rider, WorkStatus};
pub use tracking::{TrackingEvent, TrackingStatus};
