//! Multipart upload parsing.

use axum::extract::Multipart;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Read the `file` field of a multipart upload. Other fields are ignored;
/// if several `file` fields are sent, the first one wins.
pub async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
    max_bytes: u64,
) -> ServiceResult<Bytes> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Request is not a multipart upload");
        ServiceError::MissingFile
    })?;

    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(upload_error(e, max_bytes)),
        };

        if field.name() == Some("file") && file.is_none() {
            let data = field.bytes().await.map_err(|e| upload_error(e, max_bytes))?;
            debug!(bytes = data.len(), "Received upload");
            file = Some(data);
        }
    }

    file.ok_or(ServiceError::MissingFile)
}

fn upload_error(error: MultipartError, max_bytes: u64) -> ServiceError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::FileTooLarge { max: max_bytes }
    } else {
        ServiceError::MalformedUpload {
            message: error.body_text(),
        }
    }
}
