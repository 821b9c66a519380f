use axum::{
    extract::{Path, State},
    Json,
};

use super::{AppError, AppState};
use crate::models::{SyncMultipleRequest, SyncOutcome, SyncReport, SyncTableRequest};
use crate::services::SyncService;
use crate::utils::error::AppError as E;

/// 同步单张表
/// 放到独立任务里执行，客户端断开连接也不会中断进行中的同步
pub async fn sync_single_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SyncTableRequest>,
) -> Result<Json<SyncOutcome>, AppError> {
    let service = SyncService::new(state.doris.clone(), state.settings.clone())?;

    let handle = tokio::spawn(async move {
        service
            .sync_table(&id, &request.source_table, request.target_table.as_deref())
            .await
    });
    let outcome = handle
        .await
        .map_err(|e| E::Unknown(format!("Sync task panicked: {}", e)))?;

    Ok(Json(outcome))
}

/// 批量同步多张表，逐表执行并返回汇总报告
pub async fn sync_multiple_tables(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SyncMultipleRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let service = SyncService::new(state.doris.clone(), state.settings.clone())?;

    let handle = tokio::spawn(async move {
        service.sync_multiple_tables(&id, &request.tables).await
    });
    let report = handle
        .await
        .map_err(|e| E::Unknown(format!("Sync task panicked: {}", e)))?;

    Ok(Json(report))
}
