//! Paper analysis service.
//!
//! [`AnalysisService`] owns the result caches and the external backends, and
//! runs the two analysis pipelines:
//! - The full report (`report`): eight LLM stages in three phases
//! - The quick summary (`summary`): three independent LLM stages

mod inflight;
mod models;
mod prompts;
mod report;
mod summary;
mod tags;

pub use models::{AnalysisReport, AnalysisResponse, PaperSummary};

use bytes::Bytes;
use metrics::{counter, histogram};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use strum::{Display, IntoStaticStr};
use tracing::{Instrument, Span, debug, info, instrument};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::config::AppConfig;
use crate::error::{LlmError, ServiceResult};
use crate::ingestion::{
    PdfiumExtractor, TextExtractor, count_citations, count_words, extract_text, fingerprint,
};
use crate::llm::{CompletionBackend, CompletionRequest, LlmClient};

use inflight::{InFlight, Lookup};
use prompts::{PromptContext, Stage};

/// Which analysis a request asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Route {
    Report,
    Summary,
}

impl Route {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Text and statistics of an uploaded paper
#[derive(Debug, Clone)]
pub(crate) struct Paper {
    pub text: String,
    pub page_count: u32,
    pub word_count: usize,
    pub citation_count: usize,
}

/// Main service coordinator
pub struct AnalysisService {
    pub config: Arc<AppConfig>,
    pub report_cache: Arc<ResultCache<Arc<AnalysisReport>>>,
    pub summary_cache: Arc<ResultCache<Arc<PaperSummary>>>,
    llm: Arc<dyn CompletionBackend>,
    extractor: Arc<dyn TextExtractor>,
    report_flights: InFlight<AnalysisReport>,
    summary_flights: InFlight<PaperSummary>,
}

impl AnalysisService {
    /// Create a service over the given backends
    pub fn new(
        config: Arc<AppConfig>,
        llm: Arc<dyn CompletionBackend>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let ttl = config.cache.ttl();
        let capacity = config.cache.max_entries;

        info!(
            capacity,
            ttl_secs = ttl.as_secs(),
            coalesce = config.cache.coalesce_requests,
            "Initializing analysis service"
        );

        Self {
            report_cache: Arc::new(ResultCache::new(capacity, ttl)),
            summary_cache: Arc::new(ResultCache::new(capacity, ttl)),
            config,
            llm,
            extractor,
            report_flights: InFlight::default(),
            summary_flights: InFlight::default(),
        }
    }

    /// Create a service using the hosted LLM API and PDFium
    pub fn from_config(config: Arc<AppConfig>) -> ServiceResult<Self> {
        let llm = Arc::new(LlmClient::new(config.llm.clone())?);
        info!(
            url = %config.llm.base_url,
            report_model = %config.llm.report_model,
            summary_model = %config.llm.summary_model,
            "LLM client initialized"
        );
        Ok(Self::new(config, llm, Arc::new(PdfiumExtractor)))
    }

    /// Produce the full analysis report for an uploaded PDF
    pub async fn analyze_report(
        self: &Arc<Self>,
        content: Bytes,
    ) -> ServiceResult<AnalysisResponse<AnalysisReport>> {
        self.analyze(
            Route::Report,
            &self.report_cache,
            &self.report_flights,
            content,
            |service, paper| async move { service.build_report(&paper).await },
        )
        .await
    }

    /// Produce the quick summary for an uploaded PDF
    pub async fn analyze_summary(
        self: &Arc<Self>,
        content: Bytes,
    ) -> ServiceResult<AnalysisResponse<PaperSummary>> {
        self.analyze(
            Route::Summary,
            &self.summary_cache,
            &self.summary_flights,
            content,
            |service, paper| async move { service.build_summary(&paper).await },
        )
        .await
    }

    /// Fingerprint, cache lookup, pipeline run and cache store shared by
    /// both routes.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), route = %route))]
    async fn analyze<T, F, Fut>(
        self: &Arc<Self>,
        route: Route,
        cache: &Arc<ResultCache<Arc<T>>>,
        flights: &InFlight<T>,
        content: Bytes,
        build: F,
    ) -> ServiceResult<AnalysisResponse<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Arc<Self>, Paper) -> Fut + Send + 'static,
        Fut: Future<Output = ServiceResult<T>> + Send + 'static,
    {
        let started = Instant::now();
        let key = fingerprint(&content);
        debug!(fingerprint = %key, bytes = content.len(), "Analysis requested");

        let service = self.clone();
        let pipeline = async move {
            let paper = service.read_paper(content).await?;
            build(service, paper).await
        }
        .instrument(Span::current());

        let lookup = if self.config.cache.coalesce_requests {
            flights.run(key, cache.clone(), pipeline).await
        } else {
            match cache.get(&key) {
                Some(hit) => Ok(Lookup::Cached(hit)),
                None => pipeline.await.map(|value| {
                    let value = Arc::new(value);
                    cache.insert(key, value.clone());
                    Lookup::Computed(value)
                }),
            }
        };

        let route_name = route.name();
        let lookup_outcome = match &lookup {
            Ok(Lookup::Cached(_)) => "hit",
            Ok(Lookup::Joined(_)) => "coalesced",
            Ok(Lookup::Computed(_)) | Err(_) => "miss",
        };
        counter!("paperlens_cache_lookups_total", "route" => route_name, "outcome" => lookup_outcome)
            .increment(1);

        let outcome = if lookup.is_ok() { "success" } else { "error" };
        counter!("paperlens_analyses_total", "route" => route_name, "outcome" => outcome)
            .increment(1);
        histogram!("paperlens_analysis_duration_seconds", "route" => route_name)
            .record(started.elapsed().as_secs_f64());

        let response = match lookup? {
            Lookup::Cached(hit) => {
                info!("Returning cached result");
                AnalysisResponse::cached(hit)
            }
            Lookup::Computed(value) | Lookup::Joined(value) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    shared = lookup_outcome == "coalesced",
                    "Analysis complete"
                );
                AnalysisResponse::fresh(value)
            }
        };

        Ok(response)
    }

    /// Extract text from the PDF and derive its statistics
    async fn read_paper(&self, content: Bytes) -> ServiceResult<Paper> {
        let extracted = extract_text(self.extractor.clone(), content).await?;
        let paper = Paper {
            word_count: count_words(&extracted.text),
            citation_count: count_citations(&extracted.text),
            page_count: extracted.page_count,
            text: extracted.text,
        };

        info!(
            pages = paper.page_count,
            words = paper.word_count,
            citations = paper.citation_count,
            "Extracted paper text"
        );
        Ok(paper)
    }

    /// Run one LLM stage
    async fn generate(
        &self,
        stage: Stage,
        model: &str,
        context: &PromptContext<'_>,
    ) -> Result<String, LlmError> {
        let spec = stage.spec();
        let request = CompletionRequest {
            stage: stage.name(),
            model: model.to_string(),
            system: spec.system.to_string(),
            prompt: context.render(stage),
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
        };

        let started = Instant::now();
        let result = self.llm.complete(request).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        counter!("paperlens_llm_requests_total", "stage" => stage.name(), "outcome" => outcome)
            .increment(1);
        debug!(
            stage = stage.name(),
            outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stage finished"
        );

        result
    }
}
