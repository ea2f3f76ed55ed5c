//! The accumulating record threaded through one pipeline run.
//!
//! Every transition consumes the current state and returns its successor, differing by exactly
//! one appended result or by `cursor + 1`. Transitions check the alignment invariant on the way:
//! the result collections may only grow at position `cursor`, and the cursor may only advance
//! once all three results for it exist.

use crate::domain::recommendation::{AnalysisResult, RecommendationResult, ResearchResult};
use crate::domain::stock::StockRecord;
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub records: Vec<StockRecord>,
    pub cursor: usize,
    pub research: Vec<ResearchResult>,
    pub analysis: Vec<AnalysisResult>,
    pub recommendations: Vec<RecommendationResult>,
    pub report_path: Option<PathBuf>,
    pub summary_text: Option<String>,
}

impl PipelineState {
    pub fn new(records: Vec<StockRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// The record at the cursor, or `None` once every record has been processed.
    pub fn current(&self) -> Option<&StockRecord> {
        self.records.get(self.cursor)
    }

    pub fn is_terminal(&self) -> bool {
        self.cursor >= self.records.len()
    }

    pub fn research_for_cursor(&self) -> Option<&ResearchResult> {
        self.research.get(self.cursor)
    }

    pub fn analysis_for_cursor(&self) -> Option<&AnalysisResult> {
        self.analysis.get(self.cursor)
    }

    pub fn with_research(mut self, result: ResearchResult) -> anyhow::Result<Self> {
        ensure!(!self.is_terminal(), "research appended after the last record");
        ensure!(
            self.research.len() == self.cursor,
            "research for cursor {} already recorded (len={})",
            self.cursor,
            self.research.len()
        );
        self.research.push(result);
        Ok(self)
    }

    pub fn with_analysis(mut self, result: AnalysisResult) -> anyhow::Result<Self> {
        ensure!(!self.is_terminal(), "analysis appended after the last record");
        ensure!(
            self.research.len() == self.cursor + 1,
            "analysis for cursor {} requires its research first",
            self.cursor
        );
        ensure!(
            self.analysis.len() == self.cursor,
            "analysis for cursor {} already recorded (len={})",
            self.cursor,
            self.analysis.len()
        );
        self.analysis.push(result);
        Ok(self)
    }

    pub fn with_recommendation(mut self, result: RecommendationResult) -> anyhow::Result<Self> {
        ensure!(!self.is_terminal(), "recommendation appended after the last record");
        ensure!(
            self.analysis.len() == self.cursor + 1,
            "recommendation for cursor {} requires its analysis first",
            self.cursor
        );
        ensure!(
            self.recommendations.len() == self.cursor,
            "recommendation for cursor {} already recorded (len={})",
            self.cursor,
            self.recommendations.len()
        );
        self.recommendations.push(result);
        Ok(self)
    }

    pub fn advance(mut self) -> anyhow::Result<Self> {
        ensure!(!self.is_terminal(), "cannot advance past the last record");
        let next = self.cursor + 1;
        ensure!(
            self.research.len() == next
                && self.analysis.len() == next
                && self.recommendations.len() == next,
            "cursor {} is incomplete (research={}, analysis={}, recommendations={})",
            self.cursor,
            self.research.len(),
            self.analysis.len(),
            self.recommendations.len()
        );
        self.cursor = next;
        Ok(self)
    }

    pub fn with_report_path(mut self, path: PathBuf) -> Self {
        self.report_path = Some(path);
        self
    }

    pub fn with_summary_text(mut self, text: String) -> Self {
        self.summary_text = Some(text);
        self
    }

    /// Positions where a stage result's ticker differs from its input record's ticker.
    pub fn misaligned_positions(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(i, record)| {
                let t = record.ticker.as_str();
                self.research.get(*i).is_some_and(|r| r.ticker != t)
                    || self.analysis.get(*i).is_some_and(|a| a.ticker != t)
                    || self.recommendations.get(*i).is_some_and(|r| r.ticker != t)
            })
            .map(|(i, _)| i)
            .collect()
    }
}
