//! MySQL to Apache Doris Sync Tool
//! Web API Server

mod api;
mod config;
mod db;
mod generators;
mod models;
mod services;
mod utils;

use axum::Router;
use services::SyncScheduler;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doris_sync=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Doris Sync Web Server...");

    let settings = config::Settings::from_env().expect("Failed to load settings");

    // 初始化 Doris（建库 + 系统表，冷启动期会重试）
    let doris = db::init(&settings)
        .await
        .expect("Failed to initialize Doris");

    tracing::info!("Doris initialized successfully");

    // 后台调度器（SCHEDULER_ENABLED=false 可关闭）
    let scheduler_enabled = std::env::var("SCHEDULER_ENABLED")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);
    let scheduler =
        scheduler_enabled.then(|| SyncScheduler::spawn(doris.clone(), settings.clone()));

    // 创建 API 路由
    let state = api::AppState { doris, settings };
    let app = Router::new()
        .merge(api::create_router(state))
        // 请求追踪
        .layer(TraceLayer::new_for_http());

    // 服务器监听地址
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("API available at http://{}/api", addr);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // HTTP 停了之后再停调度器，正在运行的同步会跑完
    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Received shutdown signal");
}
