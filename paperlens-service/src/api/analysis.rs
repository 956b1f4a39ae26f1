//! Paper analysis endpoints.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use std::sync::Arc;

use super::AppState;
use super::upload::read_file_field;
use crate::error::ServiceError;
use crate::service::{AnalysisReport, AnalysisResponse, PaperSummary};

/// Full analysis report for an uploaded PDF
pub async fn report_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse<AnalysisReport>>, ServiceError> {
    let content = read_file_field(multipart, state.max_upload_bytes()).await?;
    let response = state.service.analyze_report(content).await?;
    Ok(Json(response))
}

/// Quick summary for an uploaded PDF
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse<PaperSummary>>, ServiceError> {
    let content = read_file_field(multipart, state.max_upload_bytes()).await?;
    let response = state.service.analyze_summary(content).await?;
    Ok(Json(response))
}
