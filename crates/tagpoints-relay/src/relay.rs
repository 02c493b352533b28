//! Delivery of purchase events to the points backend.

use tagpoints_core::PurchaseEvent;

use crate::client::PointsClient;
use crate::error::RelayError;
use crate::retry::{retry_with_delay, RELAY_MAX_RETRIES};
use crate::types::AddPointsRequest;

/// What happened to one purchase event.
#[derive(Debug)]
pub enum AwardOutcome {
    /// The backend credited the points. `balance` is the refreshed total, or
    /// `None` if neither endpoint reported one.
    Awarded { points: u32, balance: Option<i64> },
    /// Refused before any network call.
    Rejected(RelayError),
    /// Delivery failed after the retry. The event is gone.
    Dropped(RelayError),
}

impl AwardOutcome {
    #[must_use]
    pub fn is_awarded(&self) -> bool {
        matches!(self, Self::Awarded { .. })
    }
}

/// Sends purchase events for one associate ID.
pub struct PointsRelay {
    client: PointsClient,
    expected_tag: String,
    retry_delay_ms: u64,
}

impl PointsRelay {
    #[must_use]
    pub fn new(client: PointsClient, expected_tag: &str, retry_delay_ms: u64) -> Self {
        Self {
            client,
            expected_tag: expected_tag.to_owned(),
            retry_delay_ms,
        }
    }

    /// Delivers `event` at most twice: once, and once more after the fixed
    /// delay if the first attempt hit a transport error or a 5xx.
    ///
    /// Never fails. Refusals and delivery failures are logged and reported in
    /// the outcome; the caller's de-duplication record stays in place either
    /// way.
    pub async fn award(&self, event: &PurchaseEvent) -> AwardOutcome {
        if event.affiliate_tag != self.expected_tag {
            tracing::error!(
                expected = %self.expected_tag,
                actual = %event.affiliate_tag,
                "affiliate tag mismatch; refusing purchase event"
            );
            return AwardOutcome::Rejected(RelayError::TagMismatch {
                expected: self.expected_tag.clone(),
                actual: event.affiliate_tag.clone(),
            });
        }
        if !self.client.has_token() {
            tracing::warn!(
                fingerprint = %event.fingerprint,
                "no auth token stored; purchase event not sent"
            );
            return AwardOutcome::Rejected(RelayError::MissingToken);
        }

        let request = AddPointsRequest::from(event);
        let added = retry_with_delay(RELAY_MAX_RETRIES, self.retry_delay_ms, || {
            self.client.add_points(&request)
        })
        .await;

        match added {
            Ok(added) => {
                tracing::info!(
                    fingerprint = %event.fingerprint,
                    points = event.points,
                    "points recorded"
                );
                let balance = match self.client.fetch_points().await {
                    Ok(balance) => Some(balance.points),
                    Err(e) => {
                        tracing::warn!(error = %e, "balance refresh failed");
                        Some(added.points)
                    }
                };
                AwardOutcome::Awarded {
                    points: event.points,
                    balance,
                }
            }
            Err(e) => {
                tracing::error!(
                    fingerprint = %event.fingerprint,
                    error = %e,
                    "failed to record points; dropping purchase event"
                );
                AwardOutcome::Dropped(e)
            }
        }
    }

    /// Current balance, for display.
    ///
    /// # Errors
    ///
    /// Propagates [`PointsClient::fetch_points`] errors.
    pub async fn balance(&self) -> Result<i64, RelayError> {
        Ok(self.client.fetch_points().await?.points)
    }
}
