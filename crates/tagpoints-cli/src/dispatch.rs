//! Handlers for popup tab requests and runtime messages.
//!
//! Tab requests act on the page the popup is pointed at: its URL and the
//! links it contains. Runtime messages carry purchase events to the relay;
//! those that did not come through the detection pipeline are checked against
//! the processed-purchases record first.

use tagpoints_core::settings::save_associate_id;
use tagpoints_core::{
    DedupStore, KeyValueStore, PurchaseResponse, ReferralStatus, ReplaceLinksResponse, RuntimeMessage,
    Seen, TabRequest, TabResponse, UpdateStatus,
};
use tagpoints_relay::{AwardOutcome, PointsRelay, RelayError};
use tagpoints_scraper::{has_associate_id, page_links, rewrite, rewrite_links};

/// The page a tab request operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageState {
    pub(crate) url: String,
    pub(crate) hrefs: Vec<String>,
}

impl PageState {
    pub(crate) fn from_html(url: &str, html: &str) -> Self {
        Self {
            url: url.to_owned(),
            hrefs: page_links(html),
        }
    }
}

/// Answers one tab request, updating `page` in place.
pub(crate) async fn handle_tab_request<S: KeyValueStore>(
    store: &S,
    page: &mut PageState,
    request: TabRequest,
) -> TabResponse {
    match request {
        TabRequest::CheckReferral { associate_id } => TabResponse::Referral(ReferralStatus {
            has_referral: has_associate_id(&page.url, &associate_id),
        }),
        TabRequest::UpdateAssociateId { associate_id } => {
            let status = match save_associate_id(store, &associate_id).await {
                Ok(()) => "updated",
                Err(e) => {
                    tracing::error!(error = %e, "failed to save associate ID");
                    "error"
                }
            };
            TabResponse::Update(UpdateStatus {
                status: status.to_owned(),
            })
        }
        TabRequest::ReplaceAmazonLink { associate_id } => {
            TabResponse::ReplaceLinks(replace_links(page, &associate_id))
        }
    }
}

/// Rewrites the page URL if it changes; otherwise rewrites the page's links.
fn replace_links(page: &mut PageState, associate_id: &str) -> ReplaceLinksResponse {
    let new_url = rewrite(&page.url, associate_id);
    if new_url != page.url {
        tracing::info!(old = %page.url, new = %new_url, "page URL rewritten");
        page.url = new_url;
        return ReplaceLinksResponse {
            success: true,
            message: Some("URL updated".to_owned()),
            count: None,
            error: None,
        };
    }

    let (hrefs, count) = rewrite_links(&page.hrefs, associate_id);
    page.hrefs = hrefs;
    tracing::info!(count, "page links rewritten");
    ReplaceLinksResponse {
        success: true,
        message: None,
        count: Some(count),
        error: None,
    }
}

/// Records the message's `purchaseHash` and relays it only on first sight.
pub(crate) async fn record_and_relay<S: KeyValueStore>(
    dedup: &DedupStore<S>,
    relay: &PointsRelay,
    message: RuntimeMessage,
) -> PurchaseResponse {
    let RuntimeMessage::PurchaseCompleted { data } = &message;
    match dedup.check_and_record(&data.fingerprint).await {
        Ok(Seen::New) => handle_runtime_message(relay, message).await,
        Ok(Seen::AlreadySeen) => {
            tracing::info!(fingerprint = %data.fingerprint, "purchase already processed");
            PurchaseResponse::failed("Purchase already processed")
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to check processed purchases");
            PurchaseResponse::failed(format!("Failed to check processed purchases: {e}"))
        }
    }
}

/// Hands a runtime message to the relay and reports the result.
pub(crate) async fn handle_runtime_message(
    relay: &PointsRelay,
    message: RuntimeMessage,
) -> PurchaseResponse {
    match message {
        RuntimeMessage::PurchaseCompleted { data } => match relay.award(&data).await {
            AwardOutcome::Awarded { balance, .. } => {
                if let Some(balance) = balance {
                    tracing::info!(balance, "points balance updated");
                }
                PurchaseResponse::ok()
            }
            AwardOutcome::Rejected(RelayError::TagMismatch { .. }) => {
                PurchaseResponse::failed("Affiliate tag mismatch")
            }
            AwardOutcome::Rejected(e) | AwardOutcome::Dropped(e) => {
                PurchaseResponse::failed(format!("Failed to record points: {e}"))
            }
        },
    }
}
