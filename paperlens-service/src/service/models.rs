use serde::Serialize;
use std::sync::Arc;

/// Full multi-stage analysis of a paper (`POST /api/pdf`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub topics: Vec<String>,
    pub questions: Vec<String>,
    pub key_findings: Vec<String>,
    pub research_gaps: Vec<String>,
    pub future_directions: Vec<String>,
    pub methodology_critique: String,
    pub impact_analysis: String,
    pub word_count: usize,
    pub citation_count: usize,
    pub page_count: u32,
}

/// Quick three-stage summary of a paper (`POST /api/analyze-pdf`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSummary {
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub topic: String,
    pub questions: String,
    pub word_count: usize,
    pub page_count: u32,
}

/// A result as returned to the client, flagged when served from cache
#[derive(Debug, Serialize)]
pub struct AnalysisResponse<T> {
    #[serde(flatten)]
    pub result: Arc<T>,

    #[serde(skip_serializing_if = "is_false")]
    pub cached: bool,
}

impl<T> AnalysisResponse<T> {
    pub fn fresh(result: Arc<T>) -> Self {
        Self {
            result,
            cached: false,
        }
    }

    pub fn cached(result: Arc<T>) -> Self {
        Self {
            result,
            cached: true,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
