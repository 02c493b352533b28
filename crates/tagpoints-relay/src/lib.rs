//! Points backend client and the relay that awards one purchase event per
//! confirmed order.

pub mod client;
pub mod error;
pub mod points;
pub mod relay;
pub(crate) mod retry;
pub mod types;

pub use client::PointsClient;
pub use error::RelayError;
pub use points::{calculate_points, DEFAULT_POINTS, MAX_POINTS};
pub use relay::{AwardOutcome, PointsRelay};
pub use retry::RELAY_MAX_RETRIES;
pub use types::{AddPointsRequest, PointsBalance};
