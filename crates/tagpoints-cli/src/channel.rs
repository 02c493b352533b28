//! Popup-to-page request channel.
//!
//! A request goes to the page's listener with a fixed timeout. If the
//! listener is missing or silent, it is injected again and the request is
//! retried once. A second failure ends with an instruction for the user.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tagpoints_core::{KeyValueStore, TabRequest, TabResponse};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::dispatch::{handle_tab_request, PageState};

#[derive(Debug, Error)]
pub(crate) enum ChannelError {
    #[error("no listener on the page")]
    Closed,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("Please refresh the Amazon page and try again")]
    RefreshRequired,
}

/// Something that can deliver a [`TabRequest`] to a page and reload the
/// page's listener.
pub(crate) trait TabTransport: Send + Sync {
    fn send(
        &self,
        request: TabRequest,
    ) -> impl Future<Output = Result<TabResponse, ChannelError>> + Send;

    fn reinject(&self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// Sends `request`, re-injecting the listener and retrying once on failure.
///
/// # Errors
///
/// Returns [`ChannelError::RefreshRequired`] when the retry also fails or the
/// listener cannot be re-injected.
pub(crate) async fn send_with_reinject<T: TabTransport>(
    transport: &T,
    request: TabRequest,
    timeout: Duration,
) -> Result<TabResponse, ChannelError> {
    match send_with_timeout(transport, request.clone(), timeout).await {
        Ok(response) => return Ok(response),
        Err(e) => tracing::warn!(error = %e, "tab request failed; re-injecting listener"),
    }

    if let Err(e) = transport.reinject().await {
        tracing::error!(error = %e, "listener re-injection failed");
        return Err(ChannelError::RefreshRequired);
    }

    send_with_timeout(transport, request, timeout)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "tab request failed after re-injection");
            ChannelError::RefreshRequired
        })
}

async fn send_with_timeout<T: TabTransport>(
    transport: &T,
    request: TabRequest,
    timeout: Duration,
) -> Result<TabResponse, ChannelError> {
    tokio::time::timeout(timeout, transport.send(request))
        .await
        .map_err(|_| ChannelError::Timeout(timeout))?
}

type Envelope = (TabRequest, oneshot::Sender<TabResponse>);

/// In-process stand-in for a page's message listener.
///
/// Each injection spawns a fresh listener task sharing the same page state.
/// Until [`PageAgent::inject`] is called there is no listener and sends fail
/// with [`ChannelError::Closed`].
pub(crate) struct PageAgent<S> {
    store: Arc<S>,
    page: Arc<Mutex<PageState>>,
    listener: Mutex<Option<mpsc::Sender<Envelope>>>,
}

impl<S: KeyValueStore + 'static> PageAgent<S> {
    pub(crate) fn new(store: Arc<S>, page: PageState) -> Self {
        Self {
            store,
            page: Arc::new(Mutex::new(page)),
            listener: Mutex::new(None),
        }
    }

    /// Starts a listener, replacing any previous one.
    pub(crate) async fn inject(&self) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(8);
        let store = Arc::clone(&self.store);
        let page = Arc::clone(&self.page);
        tokio::spawn(async move {
            while let Some((request, reply)) = rx.recv().await {
                let mut page = page.lock().await;
                let response = handle_tab_request(store.as_ref(), &mut page, request).await;
                if reply.send(response).is_err() {
                    tracing::debug!("tab request caller went away before reply");
                }
            }
        });
        *self.listener.lock().await = Some(tx);
    }

    pub(crate) async fn page(&self) -> PageState {
        self.page.lock().await.clone()
    }
}

impl<S: KeyValueStore + 'static> TabTransport for PageAgent<S> {
    async fn send(&self, request: TabRequest) -> Result<TabResponse, ChannelError> {
        let listener = self
            .listener
            .lock()
            .await
            .clone()
            .ok_or(ChannelError::Closed)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        listener
            .send((request, reply_tx))
            .await
            .map_err(|_| ChannelError::Closed)?;
        reply_rx.await.map_err(|_| ChannelError::Closed)
    }

    async fn reinject(&self) -> Result<(), ChannelError> {
        self.inject().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tagpoints_core::{MemoryStore, ReferralStatus};

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn check() -> TabRequest {
        TabRequest::CheckReferral {
            associate_id: "shopper-21".to_owned(),
        }
    }

    fn referral() -> TabResponse {
        TabResponse::Referral(ReferralStatus { has_referral: true })
    }

    /// Hangs on the first `hang_first` sends, then answers.
    struct Flaky {
        sends: AtomicU32,
        hang_first: u32,
        reinject_ok: bool,
    }

    impl Flaky {
        fn new(hang_first: u32, reinject_ok: bool) -> Self {
            Self {
                sends: AtomicU32::new(0),
                hang_first,
                reinject_ok,
            }
        }
    }

    impl TabTransport for Flaky {
        async fn send(&self, _request: TabRequest) -> Result<TabResponse, ChannelError> {
            if self.sends.fetch_add(1, Ordering::SeqCst) < self.hang_first {
                std::future::pending::<()>().await;
            }
            Ok(referral())
        }

        async fn reinject(&self) -> Result<(), ChannelError> {
            if self.reinject_ok {
                Ok(())
            } else {
                Err(ChannelError::Closed)
            }
        }
    }

    #[tokio::test]
    async fn answers_without_retry() {
        let transport = Flaky::new(0, true);
        let response = send_with_reinject(&transport, check(), TIMEOUT).await.unwrap();
        assert_eq!(response, referral());
        assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_triggers_one_retry() {
        let transport = Flaky::new(1, true);
        let response = send_with_reinject(&transport, check(), TIMEOUT).await.unwrap();
        assert_eq!(response, referral());
        assert_eq!(transport.sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_timeout_asks_for_refresh() {
        let transport = Flaky::new(2, true);
        let err = send_with_reinject(&transport, check(), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, ChannelError::RefreshRequired));
        assert_eq!(err.to_string(), "Please refresh the Amazon page and try again");
    }

    #[tokio::test]
    async fn failed_reinjection_asks_for_refresh() {
        let transport = Flaky::new(1, false);
        let err = send_with_reinject(&transport, check(), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, ChannelError::RefreshRequired));
        assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn page_agent_without_listener_is_injected_on_retry() {
        let store = Arc::new(MemoryStore::new());
        let page = PageState {
            url: "https://www.amazon.com/dp/B01?tag=shopper-21".to_owned(),
            hrefs: Vec::new(),
        };
        let agent = PageAgent::new(store, page);
        let response = send_with_reinject(&agent, check(), TIMEOUT).await.unwrap();
        assert_eq!(response, referral());
    }

    #[tokio::test]
    async fn page_agent_keeps_page_state_across_requests() {
        let store = Arc::new(MemoryStore::new());
        let page = PageState {
            url: "https://www.amazon.com/dp/B01?ref=x".to_owned(),
            hrefs: Vec::new(),
        };
        let agent = PageAgent::new(store, page);
        agent.inject().await;
        let request = TabRequest::ReplaceAmazonLink {
            associate_id: "shopper-21".to_owned(),
        };
        send_with_reinject(&agent, request, TIMEOUT).await.unwrap();
        assert_eq!(
            agent.page().await.url,
            "https://www.amazon.com/dp/B01?tag=shopper-21"
        );
    }
}
