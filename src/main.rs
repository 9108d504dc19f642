//! Website Monitor Binary

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use website_monitor::{
    seed, ChangeDigest, Config, DashboardView, JsonFileSource, MonitoringStore,
    RefreshCoordinator, RefreshReport, Result, StatusFilter,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "website-monitor", version, about = "Website change monitoring dashboard")]
struct Args {
    /// Status filter: all, changed, unchanged or uncertain (falls back to MONITOR_FILTER)
    #[arg(long)]
    filter: Option<String>,

    /// JSON feed of website records from the fetch/diff worker
    #[arg(long, env = "MONITOR_UPDATES_FILE")]
    updates: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, env = "MONITOR_FORMAT", default_value = "text")]
    format: OutputFormat,

    /// Keep refreshing from the feed until interrupted
    #[arg(long, requires = "updates")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    info!("Starting website monitor v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let filter = args
        .filter
        .as_deref()
        .map(StatusFilter::from)
        .unwrap_or(config.default_filter);

    let now = chrono::Utc::now();
    let store = website_monitor::refresh::shared(MonitoringStore::with_websites(
        seed::default_websites(now),
        now,
    ));

    if let Some(path) = &args.updates {
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            Arc::new(JsonFileSource::new(path)),
            config.source_timeout,
        );

        let report = coordinator.refresh_once().await?;
        print_digest(&coordinator, &report, &config).await;

        if args.watch {
            info!(
                "Watching {} every {}s",
                path.display(),
                config.refresh_interval.as_secs()
            );
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to wait for shutdown signal: {}", e);
                }
            };
            let (reports_tx, mut reports_rx) = mpsc::unbounded_channel();
            let digests = async {
                while let Some(report) = reports_rx.recv().await {
                    print_digest(&coordinator, &report, &config).await;
                }
            };
            tokio::join!(
                coordinator.run(config.refresh_interval, shutdown, reports_tx),
                digests
            );
        }
    }

    let guard = store.read().await;
    let view = DashboardView::build(guard.snapshot(), filter, guard.is_refreshing());

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => print_text(&view),
    }

    Ok(())
}

async fn print_digest(coordinator: &RefreshCoordinator, report: &RefreshReport, config: &Config) {
    let guard = coordinator.store().read().await;
    match ChangeDigest::from_report(report, guard.snapshot(), config.digest_recipient.clone()) {
        Some(digest) => {
            if let Some(recipient) = &digest.recipient {
                eprintln!("To: {}", recipient);
            }
            eprintln!("Subject: {}\n\n{}\n", digest.subject, digest.body());
        }
        None => info!("No changes detected."),
    }
}

fn print_text(view: &DashboardView<'_>) {
    println!("Website Monitor Dashboard");
    println!("Last updated: {}", view.last_update.to_rfc3339());
    if view.refreshing {
        println!("(refresh in progress)");
    }

    let buttons: Vec<String> = view
        .filters
        .iter()
        .map(|option| {
            let marker = if option.selected { "*" } else { "" };
            format!("{}{} ({})", marker, option.label, option.count)
        })
        .collect();
    println!("{}\n", buttons.join("  "));

    for row in &view.websites {
        println!("{}", row.website.url);
        println!("  Status: {}", row.status_label);
        println!("  Last checked: {}", row.website.last_checked.to_rfc3339());
        if !row.website.change_history.is_empty() {
            println!("  Recent Changes:");
            for change in &row.website.change_history {
                println!("    {} - {}", change.date.to_rfc3339(), change.change_type);
            }
        }
    }
}

/// Initialize structured logging
fn initialize_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

