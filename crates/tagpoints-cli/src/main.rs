mod channel;
mod commands;
mod dispatch;
mod observer;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tagpoints_core::{AppConfig, Environment, FileStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tagpoints")]
#[command(about = "Amazon affiliate link rewriting and purchase points")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rewrite an Amazon URL to carry only essential parameters and the affiliate tag
    Rewrite {
        url: String,
        /// Associate ID to inject (defaults to the stored or configured one)
        #[arg(long)]
        associate_id: Option<String>,
    },
    /// Check whether a URL already carries the affiliate tag
    CheckReferral {
        url: String,
        #[arg(long)]
        associate_id: Option<String>,
    },
    /// Store the Associate ID used for rewriting
    SetAssociateId { associate_id: String },
    /// Store the bearer token for the points backend
    SetToken { token: String },
    /// Print the content fingerprint of a saved confirmation page
    Fingerprint {
        /// Saved HTML of the page
        file: PathBuf,
    },
    /// Capture a checkout page into the checkout session
    Checkout {
        /// Page URL
        #[arg(long)]
        url: String,
        /// Saved HTML snapshots of the page, oldest first
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },
    /// Scan a confirmation page and award points for a new, validated purchase
    Confirm {
        #[arg(long)]
        url: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Show the current points balance
    Points,
    /// Deliver a popup or runtime message (JSON) to a page
    Message {
        /// Page URL
        #[arg(long)]
        url: String,
        /// Saved HTML of the page, for link rewriting
        #[arg(long)]
        file: Option<PathBuf>,
        /// Message body, e.g. '{"action":"checkReferral","associateId":"me-21"}'
        json: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Config errors surface only in the commands that read the config.
    let config = tagpoints_core::load_app_config();
    init_tracing(config.as_ref().ok())?;
    let store = Arc::new(FileStore::new(tagpoints_core::load_store_path()));

    match cli.command {
        Some(Commands::Rewrite { url, associate_id }) => {
            commands::run_rewrite(store.as_ref(), &config?, &url, associate_id.as_deref()).await?;
        }
        Some(Commands::CheckReferral { url, associate_id }) => {
            commands::run_check_referral(store.as_ref(), &config?, &url, associate_id.as_deref())
                .await?;
        }
        Some(Commands::SetAssociateId { associate_id }) => {
            commands::run_set_associate_id(store.as_ref(), &associate_id).await?;
        }
        Some(Commands::SetToken { token }) => {
            commands::run_set_token(store.as_ref(), &token).await?;
        }
        Some(Commands::Fingerprint { file }) => commands::run_fingerprint(&file).await?,
        Some(Commands::Checkout { url, files }) => {
            commands::run_checkout(store, &config?, &url, &files).await?;
        }
        Some(Commands::Confirm { url, file }) => {
            commands::run_confirm(store, &config?, &url, &file).await?;
        }
        Some(Commands::Points) => commands::run_points(store.as_ref(), &config?).await?,
        Some(Commands::Message { url, file, json }) => {
            commands::run_message(store, &config?, &url, file.as_deref(), &json).await?;
        }
        None => println!("tagpoints: no command given; try --help"),
    }

    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over the configured level; production
/// output drops ANSI colours and module targets.
fn init_tracing(config: Option<&AppConfig>) -> anyhow::Result<()> {
    let level = config.map_or("info", |c| c.log_level.as_str());
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let plain = plain_log_output(config);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(!plain)
        .with_target(!plain)
        .init();
    Ok(())
}

fn plain_log_output(config: Option<&AppConfig>) -> bool {
    config.is_some_and(|c| c.env == Environment::Production)
}
