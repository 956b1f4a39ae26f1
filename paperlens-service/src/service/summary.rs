//! Quick summary pipeline: three independent stages on the cheaper model.

use super::prompts::{PromptContext, Stage};
use super::{AnalysisService, Paper, PaperSummary};
use crate::error::ServiceResult;

impl AnalysisService {
    pub(crate) async fn build_summary(&self, paper: &Paper) -> ServiceResult<PaperSummary> {
        let model = self.config.llm.summary_model.as_str();
        let context = PromptContext::new(&paper.text);

        let (abstract_text, topic, questions) = tokio::try_join!(
            self.generate(Stage::SummaryAbstract, model, &context),
            self.generate(Stage::SummaryTopic, model, &context),
            self.generate(Stage::SummaryQuestions, model, &context),
        )?;

        Ok(PaperSummary {
            abstract_text,
            topic,
            questions,
            word_count: paper.word_count,
            page_count: paper.page_count,
        })
    }
}
