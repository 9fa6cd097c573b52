#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![forbid(clippy::expect_used)]

pub mod config;
pub mod entities;
pub mod providers;
pub mod rpc;
pub mod services;
pub mod storage;
