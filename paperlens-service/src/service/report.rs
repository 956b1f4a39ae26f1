//! Full analysis report pipeline.
//!
//! Stages run in three phases. Stages within a phase are independent and
//! run concurrently; each phase's prompts embed the outputs of the phases
//! before it:
//! 1. abstract, topics
//! 2. questions, key findings, research gaps
//! 3. future directions, methodology critique, impact analysis

use tracing::debug;

use super::prompts::{PromptContext, Stage};
use super::tags::{format_tags, split_lines};
use super::{AnalysisReport, AnalysisService, Paper};
use crate::error::ServiceResult;

impl AnalysisService {
    pub(crate) async fn build_report(&self, paper: &Paper) -> ServiceResult<AnalysisReport> {
        let model = self.config.llm.report_model.as_str();
        let context = PromptContext::new(&paper.text);

        let (abstract_text, raw_topics) = tokio::try_join!(
            self.generate(Stage::Abstract, model, &context),
            self.generate(Stage::Topics, model, &context),
        )?;
        let topics = format_tags(&raw_topics);
        debug!(topics = topics.len(), "Report phase 1 complete");

        let context = PromptContext {
            abstract_text: &abstract_text,
            topics: &topics,
            ..context
        };
        let (questions, key_findings, research_gaps) = tokio::try_join!(
            self.generate(Stage::Questions, model, &context),
            self.generate(Stage::KeyFindings, model, &context),
            self.generate(Stage::ResearchGaps, model, &context),
        )?;
        let research_gaps = split_lines(&research_gaps);
        debug!(gaps = research_gaps.len(), "Report phase 2 complete");

        let context = PromptContext {
            gaps: &research_gaps,
            ..context
        };
        let (future_directions, methodology_critique, impact_analysis) = tokio::try_join!(
            self.generate(Stage::FutureDirections, model, &context),
            self.generate(Stage::MethodologyCritique, model, &context),
            self.generate(Stage::ImpactAnalysis, model, &context),
        )?;

        Ok(AnalysisReport {
            abstract_text,
            topics,
            questions: split_lines(&questions),
            key_findings: split_lines(&key_findings),
            research_gaps,
            future_directions: split_lines(&future_directions),
            methodology_critique,
            impact_analysis,
            word_count: paper.word_count,
            citation_count: paper.citation_count,
            page_count: paper.page_count,
        })
    }
}
