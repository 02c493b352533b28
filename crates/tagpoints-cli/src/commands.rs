//! Command handlers for the CLI.
//!
//! Each handler loads [`Settings`] from the store itself, so nothing is
//! cached between invocations. Extraction misses and delivery failures are
//! reported on stdout, not returned as errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tagpoints_core::session::load_live_session_at;
use tagpoints_core::settings::{save_associate_id, save_auth_token};
use tagpoints_core::{
    AppConfig, DedupStore, KeyValueStore, ReferralStatus, RuntimeMessage, Settings, TabRequest,
};
use tagpoints_relay::{PointsClient, PointsRelay};
use tagpoints_scraper::{classify, fingerprint, has_associate_id, is_amazon_url, rewrite, PageKind};

use crate::channel::{send_with_reinject, PageAgent};
use crate::dispatch::{handle_runtime_message, record_and_relay, PageState};
use crate::observer::{CheckoutObserver, PageSnapshot};
use crate::pipeline::{detect_purchase, Detection};

/// A message accepted by the `message` command.
#[derive(Debug, PartialEq)]
pub(crate) enum Incoming {
    Tab(TabRequest),
    Runtime(RuntimeMessage),
}

/// Parses a popup request (`action`) or a runtime message (`type`).
///
/// # Errors
///
/// Returns an error if `json` is neither.
pub(crate) fn parse_message(json: &str) -> anyhow::Result<Incoming> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| anyhow::anyhow!("message is not JSON: {e}"))?;
    if value.get("action").is_some() {
        let request = serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("invalid tab request: {e}"))?;
        return Ok(Incoming::Tab(request));
    }
    if value.get("type").is_some() {
        let message = serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("invalid runtime message: {e}"))?;
        return Ok(Incoming::Runtime(message));
    }
    anyhow::bail!("message has neither an `action` nor a `type` field")
}

/// Picks the associate ID: explicit argument, then stored setting, then
/// configuration. Purchase events are tagged with, and relayed against, the
/// same resolved value.
pub(crate) async fn resolve_associate_id<S: KeyValueStore>(
    store: &S,
    config: &AppConfig,
    explicit: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_owned());
    }
    let settings = Settings::load(store).await?;
    Ok(effective_associate_id(&settings, config))
}

fn effective_associate_id(settings: &Settings, config: &AppConfig) -> String {
    settings
        .associate_id
        .clone()
        .unwrap_or_else(|| config.associate_id.clone())
}

fn build_relay(
    config: &AppConfig,
    associate_id: &str,
    auth_token: Option<String>,
) -> anyhow::Result<PointsRelay> {
    let client = PointsClient::new(config, auth_token)
        .map_err(|e| anyhow::anyhow!("failed to build points client: {e}"))?;
    Ok(PointsRelay::new(
        client,
        associate_id,
        config.relay_retry_delay_ms,
    ))
}

async fn read_html(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn run_rewrite<S: KeyValueStore>(
    store: &S,
    config: &AppConfig,
    url: &str,
    associate_id: Option<&str>,
) -> anyhow::Result<()> {
    let id = resolve_associate_id(store, config, associate_id).await?;
    println!("{}", rewrite(url, &id));
    Ok(())
}

pub(crate) async fn run_check_referral<S: KeyValueStore>(
    store: &S,
    config: &AppConfig,
    url: &str,
    associate_id: Option<&str>,
) -> anyhow::Result<()> {
    let id = resolve_associate_id(store, config, associate_id).await?;
    print_json(&ReferralStatus {
        has_referral: has_associate_id(url, &id),
    })
}

pub(crate) async fn run_set_associate_id<S: KeyValueStore>(
    store: &S,
    associate_id: &str,
) -> anyhow::Result<()> {
    if associate_id.trim().is_empty() {
        anyhow::bail!("Please enter your Amazon Associate ID");
    }
    save_associate_id(store, associate_id).await?;
    println!("associate ID saved");
    Ok(())
}

pub(crate) async fn run_set_token<S: KeyValueStore>(store: &S, token: &str) -> anyhow::Result<()> {
    if token.trim().is_empty() {
        anyhow::bail!("auth token must not be blank");
    }
    save_auth_token(store, token).await?;
    println!("auth token saved");
    Ok(())
}

pub(crate) async fn run_fingerprint(file: &Path) -> anyhow::Result<()> {
    let html = read_html(file).await?;
    print_json(&fingerprint(&html))
}

/// Feeds each snapshot to a [`CheckoutObserver`] and prints the resulting
/// session.
pub(crate) async fn run_checkout<S: KeyValueStore + 'static>(
    store: Arc<S>,
    config: &AppConfig,
    url: &str,
    files: &[PathBuf],
) -> anyhow::Result<()> {
    if classify(url) != PageKind::Checkout {
        tracing::warn!(url, "not a checkout page; nothing captured");
        println!("not a checkout page: {url}");
        return Ok(());
    }

    let observer = CheckoutObserver::spawn(
        Arc::clone(&store),
        Duration::from_millis(config.rescan_debounce_ms),
    );
    for file in files {
        let html = read_html(file).await?;
        let snapshot = PageSnapshot {
            url: url.to_owned(),
            html,
        };
        if !observer.notify(snapshot).await {
            anyhow::bail!("checkout observer stopped early");
        }
    }
    let captures = observer.finish().await;
    tracing::debug!(captures, snapshots = files.len(), "checkout observation finished");

    match load_live_session_at(store.as_ref(), Utc::now()).await? {
        Some(session) => print_json(&session),
        None => {
            println!("no checkout session captured");
            Ok(())
        }
    }
}

/// Runs detection on a confirmation page and relays a new purchase.
pub(crate) async fn run_confirm<S: KeyValueStore + 'static>(
    store: Arc<S>,
    config: &AppConfig,
    url: &str,
    file: &Path,
) -> anyhow::Result<()> {
    if classify(url) != PageKind::Confirmation {
        tracing::warn!(url, "not a confirmation page; nothing to award");
        println!("not a confirmation page: {url}");
        return Ok(());
    }

    let html = read_html(file).await?;
    let settings = Settings::load(store.as_ref()).await?;
    let affiliate_tag = effective_associate_id(&settings, config);
    let dedup = DedupStore::new(Arc::clone(&store));

    let detection =
        detect_purchase(store.as_ref(), &dedup, &affiliate_tag, url, &html, Utc::now()).await?;
    match detection {
        Detection::Purchase(event) => {
            let relay = build_relay(config, &affiliate_tag, settings.auth_token)?;
            let response =
                handle_runtime_message(&relay, RuntimeMessage::PurchaseCompleted { data: event })
                    .await;
            print_json(&response)
        }
        Detection::Duplicate { fingerprint } => {
            println!("purchase already processed ({fingerprint})");
            Ok(())
        }
        Detection::NoSession { fingerprint } => {
            println!("no checkout session to validate against ({fingerprint})");
            Ok(())
        }
        Detection::Mismatch { fingerprint } => {
            println!("items do not match the checkout session ({fingerprint})");
            Ok(())
        }
    }
}

pub(crate) async fn run_points<S: KeyValueStore>(
    store: &S,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let settings = Settings::load(store).await?;
    if settings.auth_token.is_none() {
        anyhow::bail!("no auth token stored; run `tagpoints set-token` first");
    }
    let associate_id = effective_associate_id(&settings, config);
    let relay = build_relay(config, &associate_id, settings.auth_token)?;
    let balance = relay
        .balance()
        .await
        .map_err(|e| anyhow::anyhow!("failed to fetch points: {e}"))?;
    println!("{balance} points");
    Ok(())
}

/// Delivers a popup request to the page (through the re-injecting channel)
/// or a runtime message to the relay, once per `purchaseHash`.
pub(crate) async fn run_message<S: KeyValueStore + 'static>(
    store: Arc<S>,
    config: &AppConfig,
    url: &str,
    file: Option<&Path>,
    json: &str,
) -> anyhow::Result<()> {
    match parse_message(json)? {
        Incoming::Tab(request) => {
            if !is_amazon_url(url) {
                println!("Please navigate to an Amazon page");
                return Ok(());
            }
            let html = match file {
                Some(path) => read_html(path).await?,
                None => String::new(),
            };
            let agent = PageAgent::new(Arc::clone(&store), PageState::from_html(url, &html));
            agent.inject().await;

            let timeout = Duration::from_secs(config.channel_timeout_secs);
            match send_with_reinject(&agent, request, timeout).await {
                Ok(response) => {
                    let page = agent.page().await;
                    if page.url != url {
                        tracing::info!(url = %page.url, "page would navigate");
                    }
                    print_json(&response)
                }
                Err(e) => {
                    println!("{e}");
                    Ok(())
                }
            }
        }
        Incoming::Runtime(message) => {
            let settings = Settings::load(store.as_ref()).await?;
            let associate_id = effective_associate_id(&settings, config);
            let relay = build_relay(config, &associate_id, settings.auth_token)?;
            let dedup = DedupStore::new(Arc::clone(&store));
            print_json(&record_and_relay(&dedup, &relay, message).await)
        }
    }
}
