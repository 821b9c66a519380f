use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{AppError, AppState};
use crate::db::DatasourceRepository;
use crate::models::{ConnectionTestResult, SaveDatasourceRequest, TablePreview, TestDatasourceRequest};
use crate::services::SourceReader;

/// 测试数据源连接
pub async fn test_datasource(
    State(state): State<AppState>,
    Json(request): Json<TestDatasourceRequest>,
) -> Result<Json<ConnectionTestResult>, AppError> {
    let result = SourceReader::test_connection(&request, &state.settings).await?;
    Ok(Json(result))
}

/// 保存数据源配置
pub async fn save_datasource(
    State(state): State<AppState>,
    Json(request): Json<SaveDatasourceRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = DatasourceRepository::new(&state.doris, &state.settings);
    let id = repo.save(&request).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

/// 获取所有数据源（不含密码）
pub async fn list_datasources(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = DatasourceRepository::new(&state.doris, &state.settings);
    let datasources = repo.list().await?;
    Ok(Json(json!({
        "success": true,
        "count": datasources.len(),
        "datasources": datasources,
    })))
}

/// 删除数据源
pub async fn delete_datasource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = DatasourceRepository::new(&state.doris, &state.settings);
    repo.delete(&id).await?;
    Ok(Json(json!({ "success": true })))
}

/// 数据源库里的表列表
pub async fn list_remote_tables(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ds = DatasourceRepository::new(&state.doris, &state.settings)
        .find_by_id(&id)
        .await?;
    let tables = SourceReader::list_remote_tables(&ds, &state.settings).await?;
    Ok(Json(json!({
        "success": true,
        "count": tables.len(),
        "tables": tables,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    limit: Option<usize>,
}

/// 预览数据源表的前几行
pub async fn preview_remote_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<TablePreview>, AppError> {
    let ds = DatasourceRepository::new(&state.doris, &state.settings)
        .find_by_id(&id)
        .await?;
    let limit = query.limit.unwrap_or(100).min(1000);
    let preview = SourceReader::preview(&ds, &table, limit, &state.settings).await?;
    Ok(Json(preview))
}
