//! The run's state machine.
//!
//! `Scraping -> (Researching -> Analyzing -> Recommending -> Advancing)* -> Reporting -> Emailing
//! -> Done`. The loop-exit decision is [`route`], taken once after scraping and after every
//! advance, so an empty universe goes straight to reporting.

use crate::domain::recommendation::RecommendationResult;
use crate::domain::stock::StockRecord;
use crate::ingest::provider::UniverseProvider;
use crate::pipeline::aggregate::{top_recommended, RunAggregate, TOP_RECOMMENDED};
use crate::pipeline::analysis::AnalysisStage;
use crate::pipeline::error::PipelineError;
use crate::pipeline::recommendation::RecommendationStage;
use crate::pipeline::research::ResearchStage;
use crate::pipeline::state::PipelineState;
use crate::report::mailer::Mailer;
use crate::report::summary::compose_summary;
use crate::report::{report_title, ReportWriter};
use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scraping,
    Researching,
    Analyzing,
    Recommending,
    Advancing,
    Reporting,
    Emailing,
    Done,
}

pub fn route(state: &PipelineState) -> Phase {
    if state.is_terminal() {
        Phase::Reporting
    } else {
        Phase::Researching
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub report_date: NaiveDate,
    /// Fail the run when the universe comes back empty.
    pub require_records: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report_path: PathBuf,
    pub summary_text: String,
    pub top_recommended: Vec<RecommendationResult>,
    pub cycles: usize,
    pub delivered: bool,
    pub state: PipelineState,
}

impl PipelineOutput {
    /// Every recommendation, aligned with the input records.
    pub fn recommendations(&self) -> &[RecommendationResult] {
        &self.state.recommendations
    }
}

pub struct Orchestrator {
    universe: Arc<dyn UniverseProvider>,
    research: ResearchStage,
    analysis: AnalysisStage,
    recommendation: RecommendationStage,
    reporter: Arc<dyn ReportWriter>,
    mailer: Arc<dyn Mailer>,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(
        universe: Arc<dyn UniverseProvider>,
        research: ResearchStage,
        analysis: AnalysisStage,
        recommendation: RecommendationStage,
        reporter: Arc<dyn ReportWriter>,
        mailer: Arc<dyn Mailer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            universe,
            research,
            analysis,
            recommendation,
            reporter,
            mailer,
            options,
        }
    }

    pub async fn run(&self) -> anyhow::Result<PipelineOutput> {
        let report_date = self.options.report_date;
        let mut state = PipelineState::default();
        let mut phase = Phase::Scraping;
        let mut cycles = 0usize;
        let mut delivered = false;

        while phase != Phase::Done {
            tracing::trace!(?phase, cursor = state.cursor, "enter phase");
            phase = match phase {
                Phase::Scraping => {
                    state = PipelineState::new(self.scrape().await?);
                    route(&state)
                }
                Phase::Researching => {
                    let record = state.current().context("researching past the last record")?;
                    let result = self.research.run(record).await;
                    state = state.with_research(result)?;
                    Phase::Analyzing
                }
                Phase::Analyzing => {
                    let record = state.current().context("analyzing past the last record")?;
                    let research = state
                        .research_for_cursor()
                        .context("analysis without research")?;
                    let result = self.analysis.run(record, research).await;
                    state = state.with_analysis(result)?;
                    Phase::Recommending
                }
                Phase::Recommending => {
                    let record = state
                        .current()
                        .context("recommending past the last record")?;
                    let analysis = state
                        .analysis_for_cursor()
                        .context("recommendation without analysis")?;
                    let result = self.recommendation.run(record, analysis).await;
                    state = state.with_recommendation(result)?;
                    Phase::Advancing
                }
                Phase::Advancing => {
                    state = state.advance()?;
                    cycles += 1;
                    tracing::info!(
                        done = state.cursor,
                        total = state.records.len(),
                        "stock processed"
                    );
                    route(&state)
                }
                Phase::Reporting => {
                    check_alignment(&state)?;
                    let path = {
                        let aggregate = RunAggregate::from_state(&state);
                        self.reporter
                            .write(report_date, &aggregate)
                            .await
                            .context("failed to write report workbook")?
                    };
                    state = state.with_report_path(path);
                    Phase::Emailing
                }
                Phase::Emailing => {
                    let text = {
                        let aggregate = RunAggregate::from_state(&state);
                        compose_summary(report_date, &aggregate, state.report_path.as_deref())
                    };
                    state = state.with_summary_text(text.clone());

                    match self.mailer.send(&report_title(report_date), &text).await {
                        Ok(()) => delivered = true,
                        Err(err) => tracing::error!(
                            mailer = self.mailer.name(),
                            error = %format!("{err:#}"),
                            "summary delivery failed"
                        ),
                    }
                    Phase::Done
                }
                Phase::Done => Phase::Done,
            };
        }

        let report_path = state
            .report_path
            .clone()
            .context("run finished without a report path")?;
        let summary_text = state.summary_text.clone().unwrap_or_default();
        let top_recommended = top_recommended(&state.recommendations, TOP_RECOMMENDED)
            .into_iter()
            .cloned()
            .collect();

        Ok(PipelineOutput {
            report_path,
            summary_text,
            top_recommended,
            cycles,
            delivered,
            state,
        })
    }

    async fn scrape(&self) -> anyhow::Result<Vec<StockRecord>> {
        let provider = self.universe.provider_name();
        let records = self.universe.fetch_universe().await.map_err(|err| {
            PipelineError::UniverseUnavailable {
                provider,
                detail: format!("{err:#}"),
            }
        })?;

        if records.is_empty() {
            if self.options.require_records {
                return Err(PipelineError::EmptyUniverse { provider }.into());
            }
            tracing::warn!(provider, "universe is empty; reporting with no stocks");
        }

        tracing::info!(provider, records = records.len(), "universe loaded");
        Ok(records)
    }
}

fn check_alignment(state: &PipelineState) -> anyhow::Result<()> {
    let n = state.records.len();
    anyhow::ensure!(
        state.research.len() == n
            && state.analysis.len() == n
            && state.recommendations.len() == n,
        "stage results misaligned with {n} records (research={}, analysis={}, recommendations={})",
        state.research.len(),
        state.analysis.len(),
        state.recommendations.len()
    );

    let relabelled = state.misaligned_positions();
    if !relabelled.is_empty() {
        tracing::warn!(
            positions = ?relabelled,
            "model output overrode tickers; per-ticker lookups may miss these rows"
        );
    }
    Ok(())
}
