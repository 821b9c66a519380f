use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use super::{AppError, AppState};

/// 目标库的表列表
pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tables = state.doris.list_tables().await?;
    Ok(Json(json!({
        "success": true,
        "count": tables.len(),
        "tables": tables,
    })))
}

/// 目标表的结构
pub async fn get_table_schema(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let columns = state.doris.describe_table(&table).await?;
    let schema: Vec<serde_json::Value> = columns
        .into_iter()
        .map(|(name, col_type)| json!({ "name": name, "type": col_type }))
        .collect();

    Ok(Json(json!({
        "success": true,
        "table": table,
        "schema": schema,
    })))
}
