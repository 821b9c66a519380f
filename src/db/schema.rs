/// 数据源配置表
/// UNIQUE KEY 模型：按 id 去重，支持调度器每轮运行后的 UPDATE
pub const CREATE_SYS_DATASOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `_sys_datasources` (
    `id` VARCHAR(64),
    `name` VARCHAR(200),
    `host` VARCHAR(200),
    `port` INT,
    `user` VARCHAR(100),
    `password_encrypted` VARCHAR(500),
    `database_name` VARCHAR(200),
    `created_at` DATETIME,
    `updated_at` DATETIME
)
UNIQUE KEY(`id`)
DISTRIBUTED BY HASH(`id`) BUCKETS 1
PROPERTIES ("replication_num" = "1")
"#;

/// 定时同步任务表
pub const CREATE_SYS_SYNC_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `_sys_sync_tasks` (
    `id` VARCHAR(64),
    `datasource_id` VARCHAR(64),
    `source_table` VARCHAR(200),
    `target_table` VARCHAR(200),
    `schedule_type` VARCHAR(50),
    `schedule_minute` INT,
    `schedule_hour` INT,
    `schedule_day_of_week` INT,
    `schedule_day_of_month` INT,
    `enabled_for_ai` BOOLEAN,
    `last_sync_at` DATETIME,
    `next_sync_at` DATETIME,
    `status` VARCHAR(50),
    `created_at` DATETIME
)
UNIQUE KEY(`id`)
DISTRIBUTED BY HASH(`id`) BUCKETS 1
PROPERTIES ("replication_num" = "1")
"#;
