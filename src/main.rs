//! CLI entry point for the catalog harvester.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::catalog::{CatalogSource, HttpCatalogSource};
use harvester_core::download::HttpClient;
use harvester_core::harvest::{HarvestPlan, Harvester};
use harvester_core::inspect::PdfInspector;
use harvester_core::pipeline::{AcquisitionPipeline, HarvestState};
use harvester_core::translate::{GoogleTranslator, IdentityTranslator, Translator};
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::HarvestConfig;
use cli::Args;

/// HTTP crates kept at `warn` unless tracing is requested.
const QUIET_HTTP_TARGETS: &str = "hyper=warn,hyper_util=warn,reqwest=warn";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_filter = if args.quiet {
        "error".to_string()
    } else {
        match args.verbose {
            0 => format!("info,{QUIET_HTTP_TARGETS}"),
            1 => format!("debug,{QUIET_HTTP_TARGETS}"),
            _ => "trace".to_string(),
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let mut config = HarvestConfig::from_file(file_config.as_ref());
    apply_cli_overrides(&mut config, &args);
    debug!(?config, "configuration resolved");

    let plan = HarvestPlan::from_selection(args.classes.as_deref(), args.levels.as_deref())?;
    info!(
        classes = ?plan.classes(),
        levels = ?plan.levels(),
        output_dir = %config.output_dir.display(),
        "Harvester starting"
    );

    let client = HttpClient::with_settings(&config.client_settings())
        .context("Failed to build HTTP client")?;
    let retry = config.retry_policy();

    let source: Arc<dyn CatalogSource> = Arc::new(
        HttpCatalogSource::new(client.clone(), retry.clone(), config.api_host.as_str())
            .with_page_limit(config.page_limit),
    );
    let translator: Arc<dyn Translator> = if config.translate {
        Arc::new(GoogleTranslator::new(client.clone(), retry.clone()))
    } else {
        debug!("title translation disabled");
        Arc::new(IdentityTranslator)
    };

    let pipeline = AcquisitionPipeline::new(client, source, config.output_dir.clone())
        .with_translator(translator)
        .with_inspector(Arc::new(PdfInspector))
        .with_retry(retry)
        .with_pacer(config.pacer())
        .with_languages(config.source_lang.as_str(), config.target_lang.as_str());

    let mut state = HarvestState::new(config.asset_path(), config.failure_path());
    state.load().with_context(|| {
        format!(
            "Failed to load record tables '{}' / '{}'",
            config.asset_path().display(),
            config.failure_path().display()
        )
    })?;

    let mut harvester = Harvester::new(pipeline, state);
    let stats = harvester.run(&plan).await;

    info!(
        acquired = stats.acquired,
        skipped = stats.skipped,
        failed = stats.failed,
        partial = stats.partial,
        total = stats.total(),
        outstanding_failures = harvester.state().failures.len(),
        "Harvest complete"
    );

    Ok(())
}

fn apply_cli_overrides(config: &mut HarvestConfig, args: &Args) {
    if let Some(output_dir) = &args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if let Some(pacing_secs) = args.pacing_secs {
        config.pacing = Duration::from_secs(pacing_secs);
    }
    if args.no_translate {
        config.translate = false;
    }
}
