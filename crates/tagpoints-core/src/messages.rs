//! Messages exchanged between the page-scanning side, the popup and the
//! relay.
//!
//! Runtime messages are tagged by `type`; tab requests from the popup are
//! tagged by `action`.

use serde::{Deserialize, Serialize};

use crate::types::PurchaseEvent;

/// Messages sent from a scanned page to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeMessage {
    PurchaseCompleted { data: PurchaseEvent },
}

/// Requests the popup sends to the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TabRequest {
    #[serde(rename_all = "camelCase")]
    CheckReferral { associate_id: String },
    #[serde(rename_all = "camelCase")]
    UpdateAssociateId { associate_id: String },
    #[serde(rename_all = "camelCase")]
    ReplaceAmazonLink { associate_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatus {
    pub has_referral: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub status: String,
}

/// Reply to [`TabRequest::ReplaceAmazonLink`].
///
/// `message` is `"URL updated"` when the page itself had to navigate;
/// otherwise `count` reports how many links on the page were rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceLinksResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to any [`TabRequest`], serialized as the bare inner object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabResponse {
    Referral(ReferralStatus),
    Update(UpdateStatus),
    ReplaceLinks(ReplaceLinksResponse),
}

/// Reply to [`RuntimeMessage::PurchaseCompleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PurchaseResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn purchase_completed_parses_wire_shape() {
        let raw = json!({
            "type": "PURCHASE_COMPLETED",
            "data": {
                "timestamp": "2025-03-01T10:00:00Z",
                "points": 100,
                "affiliateTag": "shopper-21",
                "purchaseHash": "k3j2h1",
                "url": "https://www.amazon.com/gp/buy/thankyou"
            }
        });
        let RuntimeMessage::PurchaseCompleted { data } = serde_json::from_value(raw).unwrap();
        assert_eq!(data.fingerprint, "k3j2h1");
        assert_eq!(data.points, 100);
        assert_eq!(data.affiliate_tag, "shopper-21");
    }

    #[test]
    fn tab_requests_use_action_tag() {
        let req: TabRequest =
            serde_json::from_value(json!({"action": "checkReferral", "associateId": "a-21"}))
                .unwrap();
        assert_eq!(
            req,
            TabRequest::CheckReferral {
                associate_id: "a-21".to_owned()
            }
        );

        let out = serde_json::to_value(TabRequest::UpdateAssociateId {
            associate_id: "b-21".to_owned(),
        })
        .unwrap();
        assert_eq!(out, json!({"action": "updateAssociateId", "associateId": "b-21"}));
    }

    #[test]
    fn referral_status_is_camel_case() {
        let out = serde_json::to_value(ReferralStatus { has_referral: true }).unwrap();
        assert_eq!(out, json!({"hasReferral": true}));
    }

    #[test]
    fn replace_links_response_omits_absent_fields() {
        let out = serde_json::to_value(ReplaceLinksResponse {
            success: true,
            message: None,
            count: Some(3),
            error: None,
        })
        .unwrap();
        assert_eq!(out, json!({"success": true, "count": 3}));
    }

    #[test]
    fn tab_response_serializes_inner_object() {
        let out = serde_json::to_value(TabResponse::Update(UpdateStatus {
            status: "updated".to_owned(),
        }))
        .unwrap();
        assert_eq!(out, json!({"status": "updated"}));

        let back: TabResponse = serde_json::from_value(json!({"hasReferral": false})).unwrap();
        assert_eq!(
            back,
            TabResponse::Referral(ReferralStatus {
                has_referral: false
            })
        );
    }
}
