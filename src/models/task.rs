use serde::{Deserialize, Serialize};

/// 调度规则：类型 + 时刻字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// hourly / daily / weekly / monthly
    pub schedule_type: String,
    /// 分钟 (0-59)
    pub minute: u32,
    /// 小时 (0-23)
    pub hour: u32,
    /// 周几 (1-7, 1=周一)
    pub day_of_week: u32,
    /// 日期 (1-31, 计算时收敛到 28)
    pub day_of_month: u32,
}

/// 定时同步任务
#[derive(Debug, Clone, Serialize)]
pub struct SyncTask {
    pub id: String,
    pub datasource_id: String,
    pub source_table: String,
    pub target_table: String,
    #[serde(flatten)]
    pub schedule: ScheduleSpec,
    pub enabled_for_ai: bool,
    pub last_sync_at: Option<String>,
    pub next_sync_at: String,
    pub status: String,
    pub created_at: String,
}

/// 任务列表视图（附带数据源名称）
#[derive(Debug, Clone, Serialize)]
pub struct SyncTaskView {
    #[serde(flatten)]
    pub task: SyncTask,
    pub datasource_name: Option<String>,
}

/// 创建定时同步任务请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSyncTaskRequest {
    pub datasource_id: String,
    pub source_table: String,
    pub target_table: Option<String>,
    pub schedule_type: String,
    pub schedule_minute: Option<u32>,
    pub schedule_hour: Option<u32>,
    pub schedule_day_of_week: Option<u32>,
    pub schedule_day_of_month: Option<u32>,
    pub enabled_for_ai: Option<bool>,
}

impl CreateSyncTaskRequest {
    pub fn schedule_spec(&self) -> ScheduleSpec {
        ScheduleSpec {
            schedule_type: self.schedule_type.clone(),
            minute: self.schedule_minute.unwrap_or(0),
            hour: self.schedule_hour.unwrap_or(0),
            day_of_week: self.schedule_day_of_week.unwrap_or(1),
            day_of_month: self.schedule_day_of_month.unwrap_or(1),
        }
    }
}

/// 更新同步任务请求（未提供的字段保持不变）
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSyncTaskRequest {
    pub schedule_type: Option<String>,
    pub schedule_minute: Option<u32>,
    pub schedule_hour: Option<u32>,
    pub schedule_day_of_week: Option<u32>,
    pub schedule_day_of_month: Option<u32>,
    pub enabled_for_ai: Option<bool>,
}
