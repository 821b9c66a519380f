use crate::utils::error::Result;
use serde::Deserialize;
use std::time::Duration;

/// 环境变量可覆盖的全局配置，全部有默认值
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Doris FE MySQL 协议地址
    pub doris_host: String,
    pub doris_port: u16,
    pub doris_user: String,
    pub doris_password: String,
    pub doris_database: String,

    /// Doris BE Stream Load HTTP 地址
    pub stream_load_host: String,
    pub stream_load_port: u16,

    /// 源表列数上限
    pub max_columns: usize,
    /// 抽取分页大小（行）
    pub chunk_size: usize,
    /// 宽表缩放后的分页下限
    pub min_chunk_size: usize,
    /// 单次 Stream Load 的行数上限
    pub load_max_rows: usize,
    /// 单次 Stream Load 的字节上限
    pub load_max_bytes: usize,

    pub load_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Doris 端 DDL/DML 的执行超时
    pub write_timeout_secs: u64,

    /// 数据源密码的加密密钥
    pub encryption_key: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .set_default("doris_host", "localhost")?
            .set_default("doris_port", 19030)?
            .set_default("doris_user", "root")?
            .set_default("doris_password", "")?
            .set_default("doris_database", "test_db")?
            .set_default("stream_load_host", "localhost")?
            .set_default("stream_load_port", 18040)?
            .set_default("max_columns", 256)?
            .set_default("chunk_size", 5000)?
            .set_default("min_chunk_size", 500)?
            .set_default("load_max_rows", 50000)?
            .set_default("load_max_bytes", 104_857_600)?
            .set_default("load_timeout_secs", 600)?
            .set_default("connect_timeout_secs", 10)?
            .set_default("read_timeout_secs", 300)?
            .set_default("write_timeout_secs", 600)?
            .set_default("encryption_key", "doris_sync_default_key_32_bytes!")?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    /// 按列数缩放的抽取分页大小：宽表用更小的分页，窄表用基础分页
    pub fn effective_chunk_size(&self, column_count: usize) -> usize {
        let scaled = self.chunk_size / (column_count / 10).max(1);
        scaled.max(self.min_chunk_size)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Stream Load 端点的基础 URL
    pub fn stream_load_base(&self) -> String {
        format!("http://{}:{}", self.stream_load_host, self.stream_load_port)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        doris_host: "localhost".to_string(),
        doris_port: 19030,
        doris_user: "root".to_string(),
        doris_password: String::new(),
        doris_database: "test_db".to_string(),
        stream_load_host: "localhost".to_string(),
        stream_load_port: 18040,
        max_columns: 256,
        chunk_size: 5000,
        min_chunk_size: 500,
        load_max_rows: 50000,
        load_max_bytes: 104_857_600,
        load_timeout_secs: 600,
        connect_timeout_secs: 10,
        read_timeout_secs: 300,
        write_timeout_secs: 600,
        encryption_key: "doris_sync_default_key_32_bytes!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_chunk_size_narrow_table() {
        let settings = test_settings();
        // 10 列以内使用基础分页
        assert_eq!(settings.effective_chunk_size(5), 5000);
        assert_eq!(settings.effective_chunk_size(10), 5000);
    }

    #[test]
    fn test_timeouts_from_secs() {
        let settings = test_settings();
        assert_eq!(settings.connect_timeout(), Duration::from_secs(10));
        assert_eq!(settings.read_timeout(), Duration::from_secs(300));
        assert_eq!(settings.load_timeout(), Duration::from_secs(600));
        assert_eq!(settings.write_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_effective_chunk_size_wide_table() {
        let settings = test_settings();
        assert_eq!(settings.effective_chunk_size(50), 1000);
        // 极宽的表收敛到下限
        assert_eq!(settings.effective_chunk_size(200), 500);
    }
}
