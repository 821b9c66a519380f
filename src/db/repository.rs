use crate::config::Settings;
use crate::db::{now_string, DorisClient};
use crate::models::{
    CreateSyncTaskRequest, Datasource, DatasourceInfo, SaveDatasourceRequest, ScheduleSpec,
    SyncTask, SyncTaskView,
};
use crate::utils::crypto::PasswordCipher;
use crate::utils::error::{AppError, Result};
use rand::Rng;

/// 字符串字面量（带引号）
fn quote(text: &str) -> String {
    format!("'{}'", DorisClient::escape_string(text))
}

fn req_str(row: &mysql_async::Row, col: &str) -> Result<String> {
    row.get::<String, _>(col)
        .ok_or_else(|| AppError::Query(format!("Missing column `{}` in system table row", col)))
}

fn opt_str(row: &mysql_async::Row, col: &str) -> Option<String> {
    row.get::<Option<String>, _>(col).flatten()
}

fn req_i64(row: &mysql_async::Row, col: &str) -> Result<i64> {
    row.get::<i64, _>(col)
        .ok_or_else(|| AppError::Query(format!("Missing column `{}` in system table row", col)))
}

/// 8 位十六进制随机 id
fn new_id() -> String {
    format!("{:08x}", rand::thread_rng().r#gen::<u32>())
}

/// 数据源配置仓库
pub struct DatasourceRepository<'a> {
    client: &'a DorisClient,
    cipher: PasswordCipher,
}

impl<'a> DatasourceRepository<'a> {
    pub fn new(client: &'a DorisClient, settings: &Settings) -> Self {
        Self {
            client,
            cipher: PasswordCipher::new(&settings.encryption_key),
        }
    }

    /// 保存数据源（密码加密存储）
    pub async fn save(&self, req: &SaveDatasourceRequest) -> Result<String> {
        let id = new_id();
        let encrypted = self.cipher.encrypt(&req.password)?;
        let now = now_string();

        let sql = format!(
            "INSERT INTO `_sys_datasources` \
             (`id`, `name`, `host`, `port`, `user`, `password_encrypted`, \
              `database_name`, `created_at`, `updated_at`) \
             VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {})",
            quote(&id),
            quote(&req.name),
            quote(&req.host),
            req.port,
            quote(&req.user),
            quote(&encrypted),
            quote(&req.database),
            quote(&now),
            quote(&now),
        );
        self.client.execute(&sql).await?;

        Ok(id)
    }

    /// 所有数据源（不含密码）
    pub async fn list(&self) -> Result<Vec<DatasourceInfo>> {
        let sql = "SELECT `id`, `name`, `host`, `port`, `user`, `database_name`, \
                   DATE_FORMAT(`created_at`, '%Y-%m-%d %H:%i:%s') AS created_at \
                   FROM `_sys_datasources` ORDER BY `created_at` DESC";
        let rows = self.client.query_rows(sql).await?;

        rows.iter()
            .map(|row| {
                Ok(DatasourceInfo {
                    id: req_str(row, "id")?,
                    name: req_str(row, "name")?,
                    host: req_str(row, "host")?,
                    port: req_i64(row, "port")? as u16,
                    user: req_str(row, "user")?,
                    database_name: req_str(row, "database_name")?,
                    created_at: opt_str(row, "created_at").unwrap_or_default(),
                })
            })
            .collect()
    }

    /// 按 id 获取数据源（含解密密码）
    pub async fn find_by_id(&self, id: &str) -> Result<Datasource> {
        let sql = format!(
            "SELECT `id`, `name`, `host`, `port`, `user`, `password_encrypted`, `database_name` \
             FROM `_sys_datasources` WHERE `id` = {}",
            quote(id)
        );
        let rows = self.client.query_rows(&sql).await?;
        let row = rows
            .first()
            .ok_or_else(|| AppError::NotFound(format!("Datasource with id {} not found", id)))?;

        let password = self.cipher.decrypt(&req_str(row, "password_encrypted")?)?;

        Ok(Datasource {
            id: req_str(row, "id")?,
            name: req_str(row, "name")?,
            host: req_str(row, "host")?,
            port: req_i64(row, "port")? as u16,
            user: req_str(row, "user")?,
            password,
            database_name: req_str(row, "database_name")?,
        })
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM `_sys_datasources` WHERE `id` = {}", quote(id));
        self.client.execute(&sql).await
    }
}

/// 定时同步任务仓库
pub struct SyncTaskRepository<'a> {
    client: &'a DorisClient,
}

impl<'a> SyncTaskRepository<'a> {
    pub fn new(client: &'a DorisClient) -> Self {
        Self { client }
    }

    const TASK_COLUMNS: &'static str = "`id`, `datasource_id`, `source_table`, `target_table`, \
        `schedule_type`, `schedule_minute`, `schedule_hour`, `schedule_day_of_week`, \
        `schedule_day_of_month`, `enabled_for_ai`, \
        DATE_FORMAT(`last_sync_at`, '%Y-%m-%d %H:%i:%s') AS last_sync_at, \
        DATE_FORMAT(`next_sync_at`, '%Y-%m-%d %H:%i:%s') AS next_sync_at, \
        `status`, DATE_FORMAT(`created_at`, '%Y-%m-%d %H:%i:%s') AS created_at";

    fn task_from_row(row: &mysql_async::Row) -> Result<SyncTask> {
        Ok(SyncTask {
            id: req_str(row, "id")?,
            datasource_id: req_str(row, "datasource_id")?,
            source_table: req_str(row, "source_table")?,
            target_table: req_str(row, "target_table")?,
            schedule: ScheduleSpec {
                schedule_type: req_str(row, "schedule_type")?,
                minute: req_i64(row, "schedule_minute")? as u32,
                hour: req_i64(row, "schedule_hour")? as u32,
                day_of_week: req_i64(row, "schedule_day_of_week")? as u32,
                day_of_month: req_i64(row, "schedule_day_of_month")? as u32,
            },
            enabled_for_ai: req_i64(row, "enabled_for_ai")? != 0,
            last_sync_at: opt_str(row, "last_sync_at"),
            next_sync_at: opt_str(row, "next_sync_at").unwrap_or_default(),
            status: req_str(row, "status")?,
            created_at: opt_str(row, "created_at").unwrap_or_default(),
        })
    }

    /// 创建任务；next_sync_at 由调用方按调度规则计算
    pub async fn create(
        &self,
        req: &CreateSyncTaskRequest,
        next_sync_at: &str,
    ) -> Result<String> {
        let id = new_id();
        let spec = req.schedule_spec();
        let target = req
            .target_table
            .clone()
            .unwrap_or_else(|| req.source_table.clone());
        let now = now_string();

        let sql = format!(
            "INSERT INTO `_sys_sync_tasks` \
             (`id`, `datasource_id`, `source_table`, `target_table`, `schedule_type`, \
              `schedule_minute`, `schedule_hour`, `schedule_day_of_week`, `schedule_day_of_month`, \
              `enabled_for_ai`, `last_sync_at`, `next_sync_at`, `status`, `created_at`) \
             VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, NULL, {}, 'active', {})",
            quote(&id),
            quote(&req.datasource_id),
            quote(&req.source_table),
            quote(&target),
            quote(&spec.schedule_type),
            spec.minute,
            spec.hour,
            spec.day_of_week,
            spec.day_of_month,
            req.enabled_for_ai.unwrap_or(true),
            quote(next_sync_at),
            quote(&now),
        );
        self.client.execute(&sql).await?;

        Ok(id)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<SyncTask> {
        let sql = format!(
            "SELECT {} FROM `_sys_sync_tasks` WHERE `id` = {}",
            Self::TASK_COLUMNS,
            quote(id)
        );
        let rows = self.client.query_rows(&sql).await?;
        let row = rows
            .first()
            .ok_or_else(|| AppError::NotFound(format!("Sync task with id {} not found", id)))?;
        Self::task_from_row(row)
    }

    /// 更新调度规则并重置下次运行时间
    pub async fn update_schedule(
        &self,
        id: &str,
        spec: &ScheduleSpec,
        enabled_for_ai: bool,
        next_sync_at: &str,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE `_sys_sync_tasks` SET `schedule_type` = {}, `schedule_minute` = {}, \
             `schedule_hour` = {}, `schedule_day_of_week` = {}, `schedule_day_of_month` = {}, \
             `enabled_for_ai` = {}, `next_sync_at` = {} WHERE `id` = {}",
            quote(&spec.schedule_type),
            spec.minute,
            spec.hour,
            spec.day_of_week,
            spec.day_of_month,
            enabled_for_ai,
            quote(next_sync_at),
            quote(id),
        );
        self.client.execute(&sql).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM `_sys_sync_tasks` WHERE `id` = {}", quote(id));
        self.client.execute(&sql).await
    }

    /// 全部任务，带数据源名称
    pub async fn list_all(&self) -> Result<Vec<SyncTaskView>> {
        let sql = "SELECT t.`id`, t.`datasource_id`, t.`source_table`, t.`target_table`, \
             t.`schedule_type`, t.`schedule_minute`, t.`schedule_hour`, t.`schedule_day_of_week`, \
             t.`schedule_day_of_month`, t.`enabled_for_ai`, \
             DATE_FORMAT(t.`last_sync_at`, '%Y-%m-%d %H:%i:%s') AS last_sync_at, \
             DATE_FORMAT(t.`next_sync_at`, '%Y-%m-%d %H:%i:%s') AS next_sync_at, \
             t.`status`, DATE_FORMAT(t.`created_at`, '%Y-%m-%d %H:%i:%s') AS created_at, \
             d.`name` AS datasource_name \
             FROM `_sys_sync_tasks` t \
             LEFT JOIN `_sys_datasources` d ON t.`datasource_id` = d.`id` \
             ORDER BY t.`created_at` DESC";
        let rows = self.client.query_rows(sql).await?;

        rows.iter()
            .map(|row| {
                Ok(SyncTaskView {
                    task: Self::task_from_row(row)?,
                    datasource_name: opt_str(row, "datasource_name"),
                })
            })
            .collect()
    }

    /// 到期任务：一次查询完成筛选，避免重复派发
    pub async fn list_due(&self, now: &str) -> Result<Vec<SyncTask>> {
        let sql = format!(
            "SELECT {} FROM `_sys_sync_tasks` \
             WHERE `status` = 'active' AND `next_sync_at` <= {}",
            Self::TASK_COLUMNS,
            quote(now)
        );
        let rows = self.client.query_rows(&sql).await?;
        rows.iter().map(Self::task_from_row).collect()
    }

    /// 运行后的簿记：无论成败都推进 last/next
    pub async fn mark_executed(&self, id: &str, last: &str, next: &str) -> Result<()> {
        let sql = format!(
            "UPDATE `_sys_sync_tasks` SET `last_sync_at` = {}, `next_sync_at` = {} \
             WHERE `id` = {}",
            quote(last),
            quote(next),
            quote(id),
        );
        self.client.execute(&sql).await
    }

    pub async fn toggle_ai(&self, id: &str, enabled: bool) -> Result<()> {
        let sql = format!(
            "UPDATE `_sys_sync_tasks` SET `enabled_for_ai` = {} WHERE `id` = {}",
            enabled,
            quote(id),
        );
        self.client.execute(&sql).await
    }

    /// 启用了 AI 分析的目标表名（去重）
    pub async fn ai_enabled_tables(&self) -> Result<Vec<String>> {
        let sql = "SELECT DISTINCT `target_table` FROM `_sys_sync_tasks` \
                   WHERE `enabled_for_ai` = true";
        let rows = self.client.query_rows(sql).await?;
        rows.iter().map(|row| req_str(row, "target_table")).collect()
    }
}
