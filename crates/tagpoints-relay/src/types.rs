//! Points backend request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagpoints_core::PurchaseEvent;

/// Body of `POST /points/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPointsRequest {
    pub points: u32,
    pub timestamp: DateTime<Utc>,
    pub affiliate_tag: String,
    pub purchase_hash: String,
}

impl From<&PurchaseEvent> for AddPointsRequest {
    fn from(event: &PurchaseEvent) -> Self {
        Self {
            points: event.points,
            timestamp: event.timestamp,
            affiliate_tag: event.affiliate_tag.clone(),
            purchase_hash: event.fingerprint.clone(),
        }
    }
}

/// `{ "points": n }` as returned by both points endpoints. `POST /points/add`
/// also sends a `message`, which is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PointsBalance {
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_renames_fingerprint_to_purchase_hash() {
        let event = PurchaseEvent {
            fingerprint: "1oy3wiahr71".to_owned(),
            points: 4500,
            affiliate_tag: "shopper-21".to_owned(),
            timestamp: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            url: "https://www.amazon.com/gp/buy/thankyou".to_owned(),
        };
        let body = serde_json::to_value(AddPointsRequest::from(&event)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "points": 4500,
                "timestamp": "2025-03-01T10:00:00Z",
                "affiliateTag": "shopper-21",
                "purchaseHash": "1oy3wiahr71",
            })
        );
    }

    #[test]
    fn balance_ignores_extra_fields() {
        let balance: PointsBalance =
            serde_json::from_str(r#"{"message":"Points added successfully","points":5100}"#)
                .unwrap();
        assert_eq!(balance.points, 5100);
    }
}
