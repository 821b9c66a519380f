use serde::{Deserialize, Serialize};

/// 数据源连接配置（含解密后的密码，仅在进程内流转）
#[derive(Debug, Clone)]
pub struct Datasource {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database_name: String,
}

/// 对外返回的数据源信息（不含密码）
#[derive(Debug, Clone, Serialize)]
pub struct DatasourceInfo {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database_name: String,
    pub created_at: String,
}

/// 保存数据源请求
#[derive(Debug, Clone, Deserialize)]
pub struct SaveDatasourceRequest {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// 数据源连接测试请求
#[derive(Debug, Clone, Deserialize)]
pub struct TestDatasourceRequest {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

/// 连接测试结果
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub databases: Vec<String>,
}

impl ConnectionTestResult {
    pub fn success(databases: Vec<String>) -> Self {
        Self {
            success: true,
            message: "Connection successful".to_string(),
            databases,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            message: format!("Connection failed: {}", error),
            databases: Vec::new(),
        }
    }
}

/// 远程表信息
#[derive(Debug, Clone, Serialize)]
pub struct RemoteTableInfo {
    pub name: String,
    pub row_count: Option<i64>,
    pub comment: Option<String>,
}

/// 远程表预览
#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub row_count: usize,
}
