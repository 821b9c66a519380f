pub mod datasource;
pub mod metadata;
pub mod sync;
pub mod task;

use crate::config::Settings;
use crate::db::DorisClient;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

/// 各 handler 共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub doris: DorisClient,
    pub settings: Settings,
}

/// 健康检查，顺带探测 Doris 连通性
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.doris.ping().await {
        Ok(()) => Json(json!({
            "success": true,
            "doris_connected": true,
            "message": "Doris connection OK"
        })),
        Err(e) => Json(json!({
            "success": false,
            "doris_connected": false,
            "error": e.to_string()
        })),
    }
}

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health_check))

        // 目标库元数据路由
        .route("/api/tables", get(metadata::list_tables))
        .route("/api/tables/:table/schema", get(metadata::get_table_schema))

        // 数据源管理路由
        .route("/api/datasource/test", post(datasource::test_datasource))
        .route("/api/datasource", post(datasource::save_datasource))
        .route("/api/datasource", get(datasource::list_datasources))
        .route("/api/datasource/:id", delete(datasource::delete_datasource))
        .route("/api/datasource/:id/tables", get(datasource::list_remote_tables))
        .route(
            "/api/datasource/:id/tables/:table/preview",
            get(datasource::preview_remote_table),
        )

        // 同步路由
        .route("/api/datasource/:id/sync", post(sync::sync_single_table))
        .route("/api/datasource/:id/sync-multiple", post(sync::sync_multiple_tables))

        // 定时任务路由
        .route("/api/sync/schedule", post(task::create_sync_task))
        .route("/api/sync/tasks", get(task::list_sync_tasks))
        .route("/api/sync/tasks/due", get(task::list_due_tasks))
        .route("/api/sync/tasks/:id", put(task::update_sync_task))
        .route("/api/sync/tasks/:id", delete(task::delete_sync_task))
        .route("/api/sync/tasks/:id/toggle-ai", put(task::toggle_task_ai))
        .route("/api/sync/ai-enabled-tables", get(task::list_ai_enabled_tables))

        // CORS 配置
        .layer(CorsLayer::permissive())

        // 共享状态
        .with_state(state)
}

/// Axum 错误处理：按错误类别映射状态码，响应体带原始错误文本
pub struct AppError(crate::utils::error::AppError);

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use crate::utils::error::AppError as E;

        let status = match &self.0 {
            E::NotFound(_) => StatusCode::NOT_FOUND,
            E::InvalidIdentifier(_) | E::ColumnLimit(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<crate::utils::error::AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
