use crate::config::Settings;
use crate::db::{now_string, DorisClient, SyncTaskRepository, DATETIME_FORMAT};
use crate::models::ScheduleSpec;
use crate::services::sync_service::SyncService;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// 调度器句柄，持有者可以协作式停机
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    /// 通知调度循环退出并等待它结束；正在运行的同步会跑完
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}

/// 定时同步调度器
/// 每分钟查一次到期任务，逐个执行并推进簿记
pub struct SyncScheduler {
    doris: DorisClient,
    settings: Settings,
}

impl SyncScheduler {
    pub fn spawn(doris: DorisClient, settings: Settings) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let scheduler = SyncScheduler { doris, settings };
        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        SchedulerHandle {
            shutdown_tx,
            handle,
        }
    }

    async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        let service = match SyncService::new(self.doris.clone(), self.settings.clone()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Sync scheduler failed to start: {}", e);
                return;
            }
        };

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        // interval 的第一拍立即触发，消费掉它，启动后一分钟才开始巡检
        ticker.tick().await;
        tracing::info!("Sync scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(&service).await,
                _ = shutdown.recv() => {
                    tracing::info!("Sync scheduler stopped");
                    return;
                }
            }
        }
    }

    async fn tick(&self, service: &SyncService) {
        let repo = SyncTaskRepository::new(&self.doris);

        let due = match repo.list_due(&now_string()).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("Failed to list due sync tasks: {}", e);
                return;
            }
        };
        if due.is_empty() {
            return;
        }

        tracing::info!("{} sync task(s) due", due.len());
        for task in due {
            tracing::info!(
                "Running scheduled sync task {}: `{}` -> `{}`",
                task.id,
                task.source_table,
                task.target_table
            );
            let outcome = service
                .sync_table(&task.datasource_id, &task.source_table, Some(&task.target_table))
                .await;

            if outcome.success {
                tracing::info!(
                    "Scheduled sync task {} succeeded, {} rows",
                    task.id,
                    outcome.rows_synced
                );
            } else {
                // 失败不会下线任务，下一个计算出的时刻会再试
                tracing::error!(
                    "Scheduled sync task {} failed: {}",
                    task.id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }

            // 无论成败都推进 last/next，避免失败任务每分钟重跑
            let now = chrono::Local::now().naive_local();
            let next = next_occurrence(&task.schedule, now);
            if let Err(e) = repo
                .mark_executed(
                    &task.id,
                    &now.format(DATETIME_FORMAT).to_string(),
                    &next.format(DATETIME_FORMAT).to_string(),
                )
                .await
            {
                tracing::error!("Failed to update sync task {}: {}", task.id, e);
            }
        }
    }
}

/// 按调度规则计算下一次运行时间，结果严格晚于 now
/// 未知类型或字段非法时退化为 24 小时后
pub fn next_occurrence(spec: &ScheduleSpec, now: NaiveDateTime) -> NaiveDateTime {
    let fallback = now + chrono::Duration::hours(24);

    let time = match NaiveTime::from_hms_opt(spec.hour, spec.minute, 0) {
        Some(t) => t,
        None => return fallback,
    };

    match spec.schedule_type.as_str() {
        "hourly" => {
            // 只看分钟字段
            let minute_time = match NaiveTime::from_hms_opt(now.hour(), spec.minute, 0) {
                Some(t) => t,
                None => return fallback,
            };
            let candidate = now.date().and_time(minute_time);
            if candidate > now {
                candidate
            } else {
                candidate + chrono::Duration::hours(1)
            }
        }
        "daily" => {
            let candidate = now.date().and_time(time);
            if candidate > now {
                candidate
            } else {
                candidate + chrono::Duration::days(1)
            }
        }
        "weekly" => {
            // 1=周一 .. 7=周日
            if !(1..=7).contains(&spec.day_of_week) {
                return fallback;
            }
            let today = now.weekday().number_from_monday();
            let days_ahead = (spec.day_of_week + 7 - today) % 7;
            let candidate = (now.date() + chrono::Duration::days(days_ahead as i64)).and_time(time);
            if candidate > now {
                candidate
            } else {
                candidate + chrono::Duration::days(7)
            }
        }
        "monthly" => {
            // 日期收敛到 28，任何月份都有效
            let day = spec.day_of_month.clamp(1, 28);
            let this_month =
                NaiveDate::from_ymd_opt(now.year(), now.month(), day).map(|d| d.and_time(time));
            match this_month {
                Some(candidate) if candidate > now => candidate,
                _ => {
                    let (year, month) = if now.month() == 12 {
                        (now.year() + 1, 1)
                    } else {
                        (now.year(), now.month() + 1)
                    };
                    match NaiveDate::from_ymd_opt(year, month, day) {
                        Some(d) => d.and_time(time),
                        None => fallback,
                    }
                }
            }
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(schedule_type: &str, minute: u32, hour: u32, dow: u32, dom: u32) -> ScheduleSpec {
        ScheduleSpec {
            schedule_type: schedule_type.to_string(),
            minute,
            hour,
            day_of_week: dow,
            day_of_month: dom,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_hourly_same_hour_and_rollover() {
        let s = spec("hourly", 30, 0, 1, 1);
        // 当前小时的 30 分还没到
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 1, 10, 15)),
            at(2024, 1, 1, 10, 30)
        );
        // 已经过了，滚到下一小时
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 1, 10, 45)),
            at(2024, 1, 1, 11, 30)
        );
        // 23 点过后滚到次日 0 点
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 1, 23, 45)),
            at(2024, 1, 2, 0, 30)
        );
    }

    #[test]
    fn test_daily_today_and_tomorrow() {
        let s = spec("daily", 0, 9, 1, 1);
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 1, 8, 0)),
            at(2024, 1, 1, 9, 0)
        );
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 1, 9, 0)),
            at(2024, 1, 2, 9, 0)
        );
    }

    #[test]
    fn test_weekly_this_week_and_next() {
        // 2024-01-01 是周一；调度在周三 09:00
        let s = spec("weekly", 0, 9, 3, 1);
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 1, 10, 0)),
            at(2024, 1, 3, 9, 0)
        );
        // 周三 10:00 已过本周时刻，推到下周三
        assert_eq!(
            next_occurrence(&s, at(2024, 1, 3, 10, 0)),
            at(2024, 1, 10, 9, 0)
        );
    }

    #[test]
    fn test_monthly_clamps_day_to_28() {
        let s = spec("monthly", 0, 2, 1, 31);
        // 31 号收敛到 28 号，2 月也有效
        assert_eq!(
            next_occurrence(&s, at(2024, 2, 1, 0, 0)),
            at(2024, 2, 28, 2, 0)
        );
        // 本月时刻已过，推到下个月
        assert_eq!(
            next_occurrence(&s, at(2024, 2, 28, 3, 0)),
            at(2024, 3, 28, 2, 0)
        );
        // 12 月滚到次年 1 月
        assert_eq!(
            next_occurrence(&s, at(2024, 12, 28, 3, 0)),
            at(2025, 1, 28, 2, 0)
        );
    }

    #[test]
    fn test_unknown_type_falls_back_24h() {
        let s = spec("fortnightly", 0, 9, 1, 1);
        let now = at(2024, 1, 1, 10, 0);
        assert_eq!(next_occurrence(&s, now), at(2024, 1, 2, 10, 0));
    }

    #[test]
    fn test_invalid_fields_fall_back_24h() {
        let now = at(2024, 1, 1, 10, 0);
        // 无效时刻
        assert_eq!(
            next_occurrence(&spec("daily", 99, 9, 1, 1), now),
            at(2024, 1, 2, 10, 0)
        );
        // 无效星期
        assert_eq!(
            next_occurrence(&spec("weekly", 0, 9, 8, 1), now),
            at(2024, 1, 2, 10, 0)
        );
    }

    #[test]
    fn test_result_is_strictly_future() {
        // 恰好落在调度时刻上时，结果必须是下一个周期
        let now = at(2024, 1, 3, 9, 0);
        for s in [
            spec("hourly", 0, 0, 1, 1),
            spec("daily", 0, 9, 1, 1),
            spec("weekly", 0, 9, 3, 1),
            spec("monthly", 0, 9, 1, 3),
        ] {
            assert!(next_occurrence(&s, now) > now, "type {}", s.schedule_type);
        }
    }
}
