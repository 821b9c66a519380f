pub mod client;
pub mod repository;
pub mod schema;

use crate::config::Settings;
use crate::generators::DorisDDLGenerator;
use crate::utils::error::{AppError, Result};
use crate::utils::identifier;
use std::time::Duration;

pub use client::DorisClient;
pub use repository::*;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 当前本地时间，系统表簿记所用的格式
pub fn now_string() -> String {
    chrono::Local::now()
        .naive_local()
        .format(DATETIME_FORMAT)
        .to_string()
}

/// 初始化 Doris 客户端并完成系统表引导
pub async fn init(settings: &Settings) -> Result<DorisClient> {
    let client = DorisClient::new(settings);
    bootstrap(&client, settings).await?;
    Ok(client)
}

const BOOTSTRAP_MAX_RETRIES: u32 = 30;
const BOOTSTRAP_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// 建库 + 建系统表
/// 仅对冷启动期的 "backend not ready" 情况做有限次重试，其余错误直接上抛
async fn bootstrap(client: &DorisClient, settings: &Settings) -> Result<()> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match try_bootstrap(client, settings).await {
            Ok(()) => {
                tracing::info!(
                    "Doris bootstrap completed, database `{}` is ready",
                    settings.doris_database
                );
                return Ok(());
            }
            Err(e) if attempt < BOOTSTRAP_MAX_RETRIES && is_backend_not_ready(&e) => {
                tracing::warn!(
                    "Doris not ready (attempt {}/{}): {}",
                    attempt,
                    BOOTSTRAP_MAX_RETRIES,
                    e
                );
                tokio::time::sleep(BOOTSTRAP_RETRY_INTERVAL).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn try_bootstrap(client: &DorisClient, settings: &Settings) -> Result<()> {
    identifier::validate(&settings.doris_database)?;

    client
        .execute_admin(&DorisDDLGenerator::generate_create_database_ddl(
            &settings.doris_database,
        ))
        .await?;
    client.execute(schema::CREATE_SYS_DATASOURCES_TABLE).await?;
    client.execute(schema::CREATE_SYS_SYNC_TASKS_TABLE).await?;

    Ok(())
}

/// Doris 冷启动判定：FE 还没接受连接，或 BE 尚未注册就绪
fn is_backend_not_ready(e: &AppError) -> bool {
    let msg = e.to_string().to_lowercase();
    matches!(e, AppError::Connection(_) | AppError::Doris(_))
        && (msg.contains("backend")
            || msg.contains("connection refused")
            || msg.contains("connection reset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_backend_not_ready() {
        let e = AppError::Connection("Connection refused (os error 111)".to_string());
        assert!(is_backend_not_ready(&e));

        let e = AppError::Connection("Failed to find enough backend".to_string());
        assert!(is_backend_not_ready(&e));

        // 权限类错误不重试
        let e = AppError::Connection("Access denied for user 'root'".to_string());
        assert!(!is_backend_not_ready(&e));

        let e = AppError::Query("Unknown table".to_string());
        assert!(!is_backend_not_ready(&e));
    }
}
