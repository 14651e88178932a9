use crate::db::PriceStore;
use crate::error::{ExportError, IngestError};
use crate::models::PostPricesResponse;
use crate::service::{ExportService, IngestService};
use axum::{
    body::Bytes,
    extract::{Json, Multipart, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

/// 上传表单中的文件字段名
pub const UPLOAD_FIELD: &str = "file";

/// 共享状态: 导入与导出服务共用同一个存储
pub struct PricesState<S: PriceStore> {
    pub ingest: Arc<IngestService<S>>,
    pub export: Arc<ExportService<S>>,
}

impl<S: PriceStore> Clone for PricesState<S> {
    fn clone(&self) -> Self {
        Self {
            ingest: self.ingest.clone(),
            export: self.export.clone(),
        }
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// POST /api/v0/prices: 上传 zip, 返回本批次汇总
pub async fn post_prices<S: PriceStore>(
    State(state): State<PricesState<S>>,
    multipart: Multipart,
) -> Result<Json<PostPricesResponse>, IngestError> {
    let archive = read_upload(multipart).await?;
    tracing::info!("收到上传文件, {} 字节", archive.len());

    let summary = state.ingest.ingest(archive).await?;
    Ok(Json(summary.into()))
}

/// GET /api/v0/prices: 下载全部记录
pub async fn get_prices<S: PriceStore>(
    State(state): State<PricesState<S>>,
) -> Result<impl IntoResponse, ExportError> {
    let archive = state.export.export().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (header::CONTENT_DISPOSITION, "attachment; filename=data.zip"),
        ],
        archive,
    ))
}

/// 从表单中取出 file 字段
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, IngestError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::BadInput(format!("failed to parse form: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| IngestError::BadInput(format!("failed to read file: {}", e)));
        }
    }

    Err(IngestError::BadInput(
        "failed to get file from form".to_string(),
    ))
}
