use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{AppError, AppState};
use crate::db::{now_string, SyncTaskRepository, DATETIME_FORMAT};
use crate::models::{CreateSyncTaskRequest, ScheduleSpec, UpdateSyncTaskRequest};
use crate::services::next_occurrence;

fn compute_next(spec: &ScheduleSpec) -> String {
    let now = chrono::Local::now().naive_local();
    next_occurrence(spec, now).format(DATETIME_FORMAT).to_string()
}

/// 创建定时同步任务
pub async fn create_sync_task(
    State(state): State<AppState>,
    Json(request): Json<CreateSyncTaskRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let spec = request.schedule_spec();
    let next_sync_at = compute_next(&spec);

    let repo = SyncTaskRepository::new(&state.doris);
    let id = repo.create(&request, &next_sync_at).await?;

    tracing::info!(
        "Created sync task {} ({}): next run at {}",
        id,
        spec.schedule_type,
        next_sync_at
    );
    Ok(Json(json!({
        "success": true,
        "task_id": id,
        "next_sync_at": next_sync_at,
    })))
}

/// 所有定时任务（附带数据源名称）
pub async fn list_sync_tasks(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = SyncTaskRepository::new(&state.doris);
    let tasks = repo.list_all().await?;
    Ok(Json(json!({
        "success": true,
        "count": tasks.len(),
        "tasks": tasks,
    })))
}

/// 当前已到期的任务
pub async fn list_due_tasks(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = SyncTaskRepository::new(&state.doris);
    let tasks = repo.list_due(&now_string()).await?;
    Ok(Json(json!({
        "success": true,
        "count": tasks.len(),
        "tasks": tasks,
    })))
}

/// 更新任务的调度规则；未提供的字段保持原值
pub async fn update_sync_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSyncTaskRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = SyncTaskRepository::new(&state.doris);
    let existing = repo.find_by_id(&id).await?;

    let spec = ScheduleSpec {
        schedule_type: request
            .schedule_type
            .unwrap_or(existing.schedule.schedule_type),
        minute: request.schedule_minute.unwrap_or(existing.schedule.minute),
        hour: request.schedule_hour.unwrap_or(existing.schedule.hour),
        day_of_week: request
            .schedule_day_of_week
            .unwrap_or(existing.schedule.day_of_week),
        day_of_month: request
            .schedule_day_of_month
            .unwrap_or(existing.schedule.day_of_month),
    };
    let enabled_for_ai = request.enabled_for_ai.unwrap_or(existing.enabled_for_ai);

    // 规则变了，下次运行时间按新规则重算
    let next_sync_at = compute_next(&spec);
    repo.update_schedule(&id, &spec, enabled_for_ai, &next_sync_at)
        .await?;

    Ok(Json(json!({
        "success": true,
        "next_sync_at": next_sync_at,
    })))
}

/// 删除定时任务
pub async fn delete_sync_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = SyncTaskRepository::new(&state.doris);
    repo.delete(&id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ToggleAiQuery {
    enabled: bool,
}

/// 切换任务目标表的 AI 分析开关
pub async fn toggle_task_ai(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ToggleAiQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = SyncTaskRepository::new(&state.doris);
    // 先确认任务存在，避免静默更新 0 行
    repo.find_by_id(&id).await?;
    repo.toggle_ai(&id, query.enabled).await?;
    Ok(Json(json!({ "success": true, "enabled": query.enabled })))
}

/// 启用了 AI 分析的目标表清单
pub async fn list_ai_enabled_tables(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = SyncTaskRepository::new(&state.doris);
    let tables = repo.ai_enabled_tables().await?;
    Ok(Json(json!({
        "success": true,
        "count": tables.len(),
        "tables": tables,
    })))
}
