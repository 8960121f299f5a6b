//! mailgun-provider - reconciles declared Mailgun resources
//!
//! Loads a records file, reconciles every record in bounded concurrent
//! rounds, and writes external names and conditions back to the file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use mailgun_provider::{
    load_records, save_records, EnvCredentialResolver, FileSecretStore, HttpTransportFactory,
    ProviderConfig, ProviderConnector, SecretStore, SecretStorePublisher, TracingMetrics,
};
use mailgun_reconcile_common::{Controller, PassContext, Reconciler};
use mailgun_transport::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Mailgun managed-resource provider
#[derive(Parser, Debug)]
#[command(name = "mailgun-provider")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Provider configuration file (YAML)
    #[arg(short = 'c', long, env = "MAILGUN_PROVIDER_CONFIG")]
    config: Option<PathBuf>,

    /// Records file (YAML); statuses are written back to it
    #[arg(short = 'r', long)]
    records: PathBuf,

    /// Run a single round and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting mailgun-provider ---");

    match run(args).await {
        Ok(()) => {
            info!("mailgun-provider shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => ProviderConfig::default(),
    };
    let mut records = load_records(&args.records)
        .with_context(|| format!("failed to load records '{}'", args.records.display()))?;
    info!(
        records = records.len(),
        region = %config.region,
        max_concurrent = config.max_concurrent_reconciles,
        "Loaded records"
    );

    let secrets: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(&config.secret_store_dir));
    let factory = HttpTransportFactory::from_config(&config).context("failed to build HTTP client")?;
    let connector = ProviderConnector::new(
        Arc::new(EnvCredentialResolver::from_config(&config)),
        Arc::new(factory),
        secrets.clone(),
    );
    let metrics = Arc::new(TracingMetrics::new());
    let reconciler = Reconciler::new(Arc::new(connector))
        .with_publisher(Arc::new(SecretStorePublisher::new(secrets)))
        .with_metrics(metrics.clone());
    let controller =
        Controller::new(reconciler).with_max_concurrent(config.max_concurrent_reconciles);

    let cancel = CancellationToken::new();
    let ctx = PassContext::with_cancel(cancel.clone());
    let shutdown_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received SIGINT, shutting down gracefully...");
                cancel.cancel();
            }
            Err(err) => error!("Failed to listen for ctrl-c: {}", err),
        }
    });

    let mut interval = tokio::time::interval(config.poll_interval());
    let outcome = loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break Ok(()),
            _ = interval.tick() => {}
        }

        let summary = controller.run_round(&ctx, &mut records).await;
        save_records(&args.records, &records)
            .with_context(|| format!("failed to write records '{}'", args.records.display()))?;

        let totals = metrics.snapshot();
        info!(
            passes = totals.passes,
            failed_passes = totals.failed_passes,
            remote_calls = totals.remote_calls,
            "Totals since startup"
        );

        if args.once {
            if summary.failed() > 0 {
                break Err(anyhow!(
                    "{} of {} passes failed",
                    summary.failed(),
                    summary.passes.len()
                ));
            }
            break Ok(());
        }
    };

    shutdown_handle.abort();
    outcome
}
