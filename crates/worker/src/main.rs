use anyhow::Context;
use clap::Parser;
use movers_core::config::{env_parse, Settings};
use movers_core::pipeline::analysis::AnalysisStage;
use movers_core::pipeline::error::PipelineError;
use movers_core::pipeline::orchestrator::{Orchestrator, PipelineOptions};
use movers_core::pipeline::recommendation::RecommendationStage;
use movers_core::pipeline::research::ResearchStage;
use movers_core::report::mailer::OutboxMailer;
use movers_core::report::xlsx::XlsxReportWriter;
use movers_core::search::serper::SerperClient;
use movers_core::search::SearchClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod ingest;
mod universe;

const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Parser)]
#[command(name = "movers_worker")]
struct Args {
    /// Report date (YYYY-MM-DD). Defaults to the latest completed US session.
    #[arg(long)]
    report_date: Option<String>,

    /// Read the stock universe from a JSON file instead of scraping.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output directory for the workbook and summary. Overrides REPORT_DIR.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Scrape the universe into this file and exit.
    #[arg(long, conflicts_with = "input")]
    scrape_to: Option<PathBuf>,

    /// Fetch the universe and exit without model calls or output files.
    #[arg(long)]
    dry_run: bool,

    /// Allow a run over zero stocks.
    #[arg(long)]
    allow_empty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let run_id = uuid::Uuid::new_v4();
    let result = run(args, settings)
        .instrument(tracing::info_span!("run", %run_id))
        .await;

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        match err.downcast_ref::<PipelineError>() {
            Some(pipeline_err) => tracing::error!(
                %run_id,
                error = %pipeline_err,
                "pipeline aborted before processing any stock"
            ),
            None => tracing::error!(%run_id, error = %format!("{err:#}"), "run failed"),
        }
    }
    result
}

async fn run(args: Args, settings: Settings) -> anyhow::Result<()> {
    let report_date = movers_core::time::us_market::resolve_report_date(
        args.report_date.as_deref(),
        chrono::Utc::now(),
    )?;

    let universe_opts = universe::UniverseOptions::from_env().with_input(args.input);
    let universe = universe::build_universe_provider(&universe_opts)?;

    if let Some(path) = args.scrape_to.as_deref() {
        let stocks = ingest::scrape_to_file(universe.as_ref(), path).await?;
        for stock in &stocks {
            println!("{}", ingest::describe(stock));
        }
        tracing::info!(path = %path.display(), stocks = stocks.len(), "universe written");
        return Ok(());
    }

    if args.dry_run {
        let stocks = universe
            .fetch_universe()
            .await
            .with_context(|| format!("{} fetch failed", universe.provider_name()))?;
        tracing::info!(
            %report_date,
            dry_run = true,
            provider = universe.provider_name(),
            stocks = stocks.len(),
            "universe fetched (dry-run)"
        );
        return Ok(());
    }

    let out_dir = args.out_dir.unwrap_or_else(|| settings.report_dir());
    let llm = movers_core::llm::client_from_settings(&settings)?;
    let search: Arc<dyn SearchClient> = Arc::new(SerperClient::from_settings(&settings)?);
    let timeout = stage_timeout_from_env();

    tracing::info!(
        %report_date,
        llm = ?llm.provider(),
        search = search.name(),
        universe = universe.provider_name(),
        out_dir = %out_dir.display(),
        timeout_secs = timeout.as_secs(),
        "run started"
    );

    let orchestrator = Orchestrator::new(
        universe,
        ResearchStage::new(search, llm.clone(), timeout),
        AnalysisStage::new(llm.clone(), timeout),
        RecommendationStage::new(llm, timeout),
        Arc::new(XlsxReportWriter::new(&out_dir)),
        Arc::new(OutboxMailer::new(&out_dir, report_date)),
        PipelineOptions {
            report_date,
            require_records: !args.allow_empty,
        },
    );

    let output = tokio::select! {
        res = orchestrator.run() => res?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted before the report was written"),
    };

    if !output.delivered {
        sentry::capture_message("daily movers summary was not delivered", sentry::Level::Warning);
    }

    let top: Vec<&str> = output
        .top_recommended
        .iter()
        .map(|r| r.ticker.as_str())
        .collect();
    tracing::info!(
        %report_date,
        report = %output.report_path.display(),
        stocks = output.cycles,
        top = ?top,
        delivered = output.delivered,
        "run finished"
    );
    println!("{}", output.summary_text);
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn stage_timeout_from_env() -> Duration {
    stage_timeout(env_parse("STAGE_TIMEOUT_SECS", DEFAULT_STAGE_TIMEOUT_SECS))
}

fn stage_timeout(secs: u64) -> Duration {
    match secs {
        0 => Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        n => Duration::from_secs(n),
    }
}
