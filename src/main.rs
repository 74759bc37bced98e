//! Gista command line.
//!
//! Drives the CrewAI notification client by hand: trigger status updates,
//! inspect gists and links, and check the resolved configuration. Results go
//! to stdout as pretty JSON, logs go to stderr.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use gista_core::{LinkDraft, StoredLink};
use gista_notify::{NotificationClient, NotificationResult, NotifyConfig};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "gista", version, about = "Talk to the CrewAI production service")]
struct Cli {
    /// Configuration file layered under the environment
    #[arg(long, global = true, default_value = gista_notify::config::CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Signal that a gist should move into production
    Status {
        user_id: String,
        gist_id: String,
        #[command(flatten)]
        strict: Strict,
    },
    /// Update the production status of several gists
    Batch {
        user_id: String,
        #[arg(required = true)]
        gist_ids: Vec<String>,
        #[command(flatten)]
        production: Production,
        #[command(flatten)]
        strict: Strict,
    },
    /// Replace a gist's links and production status
    WithLinks {
        user_id: String,
        gist_id: String,
        /// Link to attach; repeat for several
        #[arg(long = "link", required = true)]
        links: Vec<String>,
        #[command(flatten)]
        production: Production,
        #[command(flatten)]
        strict: Strict,
    },
    /// Show a user's gists, or one gist
    Gists { user_id: String, gist_id: Option<String> },
    /// Show a user's links, or the links of one gist
    Links {
        user_id: String,
        #[arg(long)]
        gist: Option<String>,
    },
    /// Store a new link
    AddLink {
        user_id: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        /// Attach to this gist instead of the user's general links
        #[arg(long, conflicts_with = "auto_gist")]
        gist: Option<String>,
        /// Have the service create a gist for the link, then notify production
        #[arg(long)]
        auto_gist: bool,
    },
    /// Print the resolved configuration with the API key masked
    Config,
}

#[derive(Debug, Args)]
struct Strict {
    /// Exit non-zero when the notification fails
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct Production {
    /// One of draft, review, published; anything else is sent as review
    #[arg(long, default_value = "review")]
    status: String,
    /// Send inProduction = false
    #[arg(long)]
    not_in_production: bool,
}

/// Link body asking the service to create a gist alongside the link.
#[derive(Debug, Serialize)]
struct AutoGistLink<'a> {
    #[serde(flatten)]
    link: &'a StoredLink,
    auto_create_gist: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = NotifyConfig::load_from(&cli.config).context("Failed to load configuration")?;

    if let Command::Config = cli.command {
        return print_json(&config_report(&config));
    }

    let client_config = config.to_client_config().context("Invalid notification configuration")?;
    info!(
        base_url = %client_config.base_url,
        api_key = %config.api_key_masked(),
        max_retries = client_config.max_retries,
        "Configuration loaded"
    );
    let client =
        NotificationClient::new(client_config).context("Failed to create notification client")?;

    let output = run(&client, cli.command).await?;
    print_json(&output)
}

async fn run(client: &NotificationClient, command: Command) -> Result<Value> {
    match command {
        Command::Status { user_id, gist_id, strict } => {
            if strict.strict {
                return client
                    .notify_status_change_strict(&user_id, &gist_id)
                    .await
                    .context("Status notification failed");
            }
            Ok(client.notify_status_change(&user_id, &gist_id).await.into_value())
        },
        Command::Batch { user_id, gist_ids, production, strict } => {
            let in_production = !production.not_in_production;
            if strict.strict {
                return client
                    .batch_notify_strict(&user_id, &gist_ids, in_production, &production.status)
                    .await
                    .context("Batch update failed");
            }
            Ok(client
                .batch_notify(&user_id, &gist_ids, in_production, &production.status)
                .await
                .into_value())
        },
        Command::WithLinks { user_id, gist_id, links, production, strict } => {
            let links: Vec<Value> = links.into_iter().map(Value::String).collect();
            let in_production = !production.not_in_production;
            if strict.strict {
                return client
                    .update_gist_with_links_strict(
                        &user_id,
                        &gist_id,
                        &links,
                        in_production,
                        &production.status,
                    )
                    .await
                    .context("Gist link update failed");
            }
            Ok(client
                .update_gist_with_links(&user_id, &gist_id, &links, in_production, &production.status)
                .await
                .into_value())
        },
        Command::Gists { user_id, gist_id } => match gist_id {
            Some(gist_id) => {
                client.get_user_gist(&user_id, &gist_id).await.context("Failed to fetch gist")
            },
            None => client.get_user_gists(&user_id).await.context("Failed to fetch gists"),
        },
        Command::Links { user_id, gist } => match gist {
            Some(gist_id) => client
                .get_gist_links(&user_id, &gist_id)
                .await
                .context("Failed to fetch gist links"),
            None => client.get_user_links(&user_id).await.context("Failed to fetch links"),
        },
        Command::AddLink { user_id, url, title, category, image_url, gist, auto_gist } => {
            let link =
                StoredLink::from_draft(LinkDraft { url, title, category, image_url }, Utc::now());

            if let Some(gist_id) = gist {
                return client
                    .add_link_to_gist(&user_id, &gist_id, &link)
                    .await
                    .context("Failed to add link to gist");
            }

            if !auto_gist {
                return client.add_general_link(&user_id, &link).await.context("Failed to add link");
            }

            let stored = client
                .add_general_link(&user_id, &AutoGistLink { link: &link, auto_create_gist: true })
                .await
                .context("Failed to add link")?;

            let gist_id = stored.get("gistId").and_then(Value::as_str).map(str::to_string);
            let notification = match &gist_id {
                Some(gist_id) => client.notify_status_change(&user_id, gist_id).await,
                None => {
                    warn!(user_id = %user_id, link_id = link.link_id(), "Link stored without a gist");
                    NotificationResult::Failed {
                        error: "service did not return a gistId for the stored link".to_string(),
                    }
                },
            };

            Ok(json!({
                "link": stored,
                "gistId": gist_id,
                "notification": notification,
            }))
        },
        Command::Config => Ok(Value::Null),
    }
}

fn config_report(config: &NotifyConfig) -> Value {
    json!({
        "base_url": config.base_url(),
        "api_key": config.api_key_masked(),
        "max_retries": config.max_retries,
        "retry_delay_seconds": config.retry_delay_seconds,
        "timeout_seconds": config.timeout_seconds,
        "user_agent": config.user_agent,
        "required_vars": NotifyConfig::required_vars(),
    })
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gista=debug,gista_notify=debug"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
