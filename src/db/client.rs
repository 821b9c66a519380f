use crate::config::Settings;
use crate::utils::error::{AppError, Result};
use crate::utils::identifier;
use mysql_async::prelude::*;
use std::time::Duration;

/// Doris FE 客户端（MySQL 协议）
/// Doris 对服务端预处理语句支持不稳定，这里只使用文本协议
#[derive(Clone)]
pub struct DorisClient {
    opts: mysql_async::Opts,
    admin_opts: mysql_async::Opts,
    database: String,
    write_timeout: Duration,
}

impl DorisClient {
    pub fn new(settings: &Settings) -> Self {
        // 禁用 socket，只使用 TCP（Doris 不支持 @@socket 变量）
        let base = || {
            mysql_async::OptsBuilder::default()
                .ip_or_hostname(&settings.doris_host)
                .tcp_port(settings.doris_port)
                .user(Some(&settings.doris_user))
                .pass(Some(&settings.doris_password))
                .prefer_socket(false)
        };

        Self {
            opts: mysql_async::Opts::from(
                base().db_name(Some(&settings.doris_database)),
            ),
            // 不带库的连接，用于 CREATE DATABASE
            admin_opts: mysql_async::Opts::from(base()),
            database: settings.doris_database.clone(),
            write_timeout: settings.write_timeout(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    async fn conn(&self) -> Result<mysql_async::Conn> {
        mysql_async::Conn::new(self.opts.clone())
            .await
            .map_err(|e| AppError::Connection(format!("Doris connection failed: {}", e)))
    }

    /// 连通性检查
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let result = conn.query_drop("SELECT 1").await;
        let _ = conn.disconnect().await;
        result.map_err(AppError::from)
    }

    /// 执行 DDL/DML（不返回结果），受写超时约束
    pub async fn execute(&self, sql: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let result = tokio::time::timeout(self.write_timeout, conn.query_drop(sql)).await;
        let _ = conn.disconnect().await;
        match result {
            Ok(r) => r.map_err(AppError::from),
            Err(_) => Err(AppError::Query(format!(
                "Doris statement timed out after {}s",
                self.write_timeout.as_secs()
            ))),
        }
    }

    /// 不选库执行（用于 CREATE DATABASE）
    pub async fn execute_admin(&self, sql: &str) -> Result<()> {
        let mut conn = mysql_async::Conn::new(self.admin_opts.clone())
            .await
            .map_err(|e| AppError::Connection(format!("Doris connection failed: {}", e)))?;
        let result = tokio::time::timeout(self.write_timeout, conn.query_drop(sql)).await;
        let _ = conn.disconnect().await;
        match result {
            Ok(r) => r.map_err(AppError::from),
            Err(_) => Err(AppError::Query(format!(
                "Doris statement timed out after {}s",
                self.write_timeout.as_secs()
            ))),
        }
    }

    /// 查询并返回原始行
    pub async fn query_rows(&self, sql: &str) -> Result<Vec<mysql_async::Row>> {
        let mut conn = self.conn().await?;
        let result = conn.query(sql).await;
        let _ = conn.disconnect().await;
        result.map_err(AppError::from)
    }

    /// 查询首行首列
    pub async fn query_scalar<T>(&self, sql: &str) -> Result<Option<T>>
    where
        T: FromRow + Send + 'static,
    {
        let mut conn = self.conn().await?;
        let result = conn.query_first::<T, _>(sql).await;
        let _ = conn.disconnect().await;
        result.map_err(AppError::from)
    }

    /// 目标库的表列表
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let result = conn.query::<String, _>("SHOW TABLES").await;
        let _ = conn.disconnect().await;
        result.map_err(AppError::from)
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        identifier::validate(table)?;
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}'",
            Self::escape_string(&self.database),
            Self::escape_string(table)
        );
        let count: Option<i64> = self.query_scalar(&sql).await?;
        Ok(count.unwrap_or(0) > 0)
    }

    /// 表结构：(列名, 类型) 列表，按定义顺序
    pub async fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>> {
        identifier::validate(table)?;
        let rows = self.query_rows(&format!("DESCRIBE `{}`", table)).await?;

        rows.into_iter()
            .map(|row| {
                let field: String = row.get("Field").ok_or_else(|| {
                    AppError::Query("DESCRIBE returned a row without Field".to_string())
                })?;
                let col_type: String = row.get("Type").ok_or_else(|| {
                    AppError::Query("DESCRIBE returned a row without Type".to_string())
                })?;
                Ok((field, col_type))
            })
            .collect()
    }

    /// 转义字符串字面量（文本协议下拼 SQL 的唯一取值通道）
    pub fn escape_string(text: &str) -> String {
        text.replace('\\', "\\\\").replace('\'', "\\'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string() {
        assert_eq!(DorisClient::escape_string("plain"), "plain");
        assert_eq!(DorisClient::escape_string("o'brien"), "o\\'brien");
        assert_eq!(DorisClient::escape_string(r"a\b"), r"a\\b");
    }
}
