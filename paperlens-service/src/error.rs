use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("File too large (max {max} bytes)")]
    FileTooLarge { max: u64 },

    #[error("Malformed upload: {message}")]
    MalformedUpload { message: String },

    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// Failure reported by another request's pipeline run (coalesced requests),
    /// carrying that run's error code
    #[error("{message}")]
    Analysis { message: String, code: &'static str },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Chat-completion client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection failed to LLM API at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("LLM request for {stage} failed (status {status}): {message}")]
    Api {
        stage: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from LLM API")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },

    #[error("LLM response for {stage} contained no choices")]
    NoChoices { stage: String },
}

/// PDF text extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to extract text from PDF: PDFium library unavailable ({message})")]
    LibraryUnavailable { message: String },

    #[error("Failed to extract text from PDF: {message}")]
    Load { message: String },

    #[error("Failed to extract text from page {page}: {message}")]
    Page { page: u32, message: String },

    #[error("Extraction task failed")]
    Join(#[source] tokio::task::JoinError),
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingFile => StatusCode::BAD_REQUEST,
            ServiceError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::MissingFile => "missing_file",
            ServiceError::FileTooLarge { .. } => "file_too_large",
            ServiceError::MalformedUpload { .. } => "malformed_upload",
            ServiceError::Llm(_) => "llm_request_failed",
            ServiceError::Extraction(_) => "pdf_extraction_failed",
            ServiceError::Analysis { code, .. } => *code,
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }

    /// Message shown to API callers. Server-side failures all read as a
    /// failed analysis; only client mistakes get their own wording.
    pub fn user_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => format!("Error analyzing PDF: {}", self),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                code = self.error_code(),
                error = %format_error_chain(&self),
                "Error analyzing PDF"
            );
        }

        let response = ErrorResponse {
            error: self.user_message(),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error and all of its sources as `outer: inner: root`.
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.ends_with(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::MissingFile.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::FileTooLarge { max: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServiceError::MalformedUpload {
                message: "bad boundary".to_string()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Extraction(ExtractionError::Load {
                message: "not a pdf".to_string()
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_message() {
        assert_eq!(ServiceError::MissingFile.user_message(), "No file uploaded");

        let err = ServiceError::Llm(LlmError::NoChoices {
            stage: "abstract".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Error analyzing PDF: LLM response for abstract contained no choices"
        );
    }

    #[test]
    fn test_shared_failure_keeps_original_code() {
        let original = ServiceError::Llm(LlmError::NoChoices {
            stage: "topics".to_string(),
        });
        let shared = ServiceError::Analysis {
            message: original.to_string(),
            code: original.error_code(),
        };
        assert_eq!(shared.error_code(), "llm_request_failed");
        assert_eq!(shared.status_code(), original.status_code());
        assert_eq!(shared.user_message(), original.user_message());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "No file uploaded".to_string(),
            code: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"error":"No file uploaded"}"#);
    }

    #[test]
    fn test_format_error_chain() {
        let io = std::io::Error::other("disk on fire");
        let err = ServiceError::Internal {
            message: "write failed".to_string(),
        };
        assert_eq!(format_error_chain(&err), "Internal error: write failed");
        assert_eq!(format_error_chain(&io), "disk on fire");
    }
}
