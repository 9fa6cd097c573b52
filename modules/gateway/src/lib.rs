#![forbid(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod middleware;
pub mod observability;
pub mod router;
pub mod state;
