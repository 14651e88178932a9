use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 压缩包读写错误
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("member {0} not found in archive")]
    NotFound(String),
    #[error("corrupt archive: {0}")]
    Corrupt(String),
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => ArchiveError::Io(e),
            other => ArchiveError::Corrupt(other.to_string()),
        }
    }
}

/// CSV 结构错误 (整体无法解析)
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("header row is missing")]
    MissingHeader,
    #[error("malformed csv at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
    #[error("csv write failed: {0}")]
    Write(String),
}

impl From<csv::Error> for RecordError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        RecordError::Malformed {
            line,
            reason: err.to_string(),
        }
    }
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("bad input: {0}")]
    BadInput(String),
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ArchiveError> for IngestError {
    fn from(err: ArchiveError) -> Self {
        IngestError::BadInput(err.to_string())
    }
}

impl From<RecordError> for IngestError {
    fn from(err: RecordError) -> Self {
        IngestError::BadInput(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),
    #[error("encoding failure: {0}")]
    EncodingFailure(String),
}

impl From<ArchiveError> for ExportError {
    fn from(err: ArchiveError) -> Self {
        ExportError::EncodingFailure(err.to_string())
    }
}

impl From<RecordError> for ExportError {
    fn from(err: RecordError) -> Self {
        ExportError::EncodingFailure(err.to_string())
    }
}

/// 失败响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorResponse {
        success: false,
        message,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        match self {
            IngestError::BadInput(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            IngestError::StorageFailure(e) => {
                tracing::error!("ingest storage failure: {}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to store records".to_string(),
                )
            }
            IngestError::Internal(msg) => {
                tracing::error!("ingest internal error: {}", msg);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let message = match &self {
            ExportError::StorageFailure(_) => "failed to query database",
            ExportError::EncodingFailure(_) => "failed to create zip archive",
        };
        tracing::error!("export failed: {}", self);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }
}
