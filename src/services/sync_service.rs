use crate::config::Settings;
use crate::db::{DatasourceRepository, DorisClient};
use crate::models::{LoadResult, SyncOutcome, SyncReport, SyncTableRequest};
use crate::services::schema_sync::SchemaReconciler;
use crate::services::source_reader::SourceReader;
use crate::services::stream_load::StreamLoader;
use crate::utils::error::Result;

/// 同步编排：抽取 -> 对齐表结构 -> 分批加载
pub struct SyncService {
    doris: DorisClient,
    settings: Settings,
    loader: StreamLoader,
}

impl SyncService {
    pub fn new(doris: DorisClient, settings: Settings) -> Result<Self> {
        let loader = StreamLoader::new(&settings)?;
        Ok(Self {
            doris,
            settings,
            loader,
        })
    }

    /// 同步单张表；目标表名缺省取源表名
    /// 错误不上抛，折叠进结果里，批量同步时一张表失败不拖垮其他表
    pub async fn sync_table(
        &self,
        datasource_id: &str,
        source_table: &str,
        target_table: Option<&str>,
    ) -> SyncOutcome {
        let target = target_table.unwrap_or(source_table).to_string();
        tracing::info!("Starting sync: `{}` -> `{}`", source_table, target);

        match self
            .run_table_sync(datasource_id, source_table, &target)
            .await
        {
            Ok((rows_synced, table_created, load_result)) => {
                tracing::info!(
                    "Sync finished: `{}` -> `{}`, {} rows",
                    source_table,
                    target,
                    rows_synced
                );
                SyncOutcome {
                    source_table: source_table.to_string(),
                    target_table: target,
                    success: true,
                    rows_synced,
                    table_created,
                    error: None,
                    load_result,
                }
            }
            Err(e) => {
                tracing::error!("Sync failed: `{}` -> `{}`: {}", source_table, target, e);
                SyncOutcome::failure(source_table, &target, e.to_string())
            }
        }
    }

    async fn run_table_sync(
        &self,
        datasource_id: &str,
        source_table: &str,
        target_table: &str,
    ) -> Result<(u64, bool, Option<LoadResult>)> {
        let ds = DatasourceRepository::new(&self.doris, &self.settings)
            .find_by_id(datasource_id)
            .await?;

        let mut reader = SourceReader::open(&ds, source_table, &self.settings).await?;
        let reconciler = SchemaReconciler::new(&self.doris, &self.settings);

        let mut rows_synced = 0u64;
        let mut table_created = false;
        let mut merged: Option<LoadResult> = None;
        let mut first_batch = true;

        while let Some(batch) = reader.next_batch().await {
            let batch = batch?;
            if batch.is_empty() {
                continue;
            }

            // 表结构只在首批数据上对齐一次
            if first_batch {
                table_created = reconciler
                    .ensure_target_table(target_table, &batch.columns)
                    .await?;
                first_batch = false;
            }

            let result = self.loader.load_batch(target_table, &batch).await?;
            rows_synced += batch.len() as u64;
            merged = Some(LoadResult::accumulate(merged, result));
        }

        // 空源表：成功返回 0 行，目标端不做任何 DDL
        Ok((rows_synced, table_created, merged))
    }

    /// 顺序同步多张表，汇总成一份报告
    /// 串行执行避免压垮 Stream Load 端点
    pub async fn sync_multiple_tables(
        &self,
        datasource_id: &str,
        entries: &[SyncTableRequest],
    ) -> SyncReport {
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = self
                .sync_table(
                    datasource_id,
                    &entry.source_table,
                    entry.target_table.as_deref(),
                )
                .await;
            results.push(outcome);
        }
        Self::build_report(results)
    }

    fn build_report(results: Vec<SyncOutcome>) -> SyncReport {
        let total = results.len();
        let success_count = results.iter().filter(|r| r.success).count();
        let fail_count = total - success_count;

        let error = (fail_count > 0).then(|| {
            let first = results
                .iter()
                .find(|r| !r.success)
                .and_then(|r| r.error.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            format!("{} of {} tables failed, first error: {}", fail_count, total, first)
        });

        SyncReport {
            success: fail_count == 0,
            total,
            success_count,
            fail_count,
            error,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_outcome(name: &str, rows: u64) -> SyncOutcome {
        SyncOutcome {
            source_table: name.to_string(),
            target_table: name.to_string(),
            success: true,
            rows_synced: rows,
            table_created: false,
            error: None,
            load_result: None,
        }
    }

    #[test]
    fn test_build_report_all_success() {
        let report =
            SyncService::build_report(vec![ok_outcome("a", 10), ok_outcome("b", 20)]);
        assert!(report.success);
        assert_eq!(report.total, 2);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.fail_count, 0);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_build_report_partial_failure() {
        let failed = SyncOutcome::failure("b", "b", "table `b` does not exist".to_string());
        let report = SyncService::build_report(vec![
            ok_outcome("a", 10),
            failed,
            ok_outcome("c", 5),
        ]);

        assert!(!report.success);
        assert_eq!(report.total, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.fail_count, 1);
        // 顶层错误指向第一张失败的表
        assert!(report.error.as_deref().unwrap().contains("does not exist"));
        assert_eq!(report.results.len(), 3);
    }

    #[test]
    fn test_build_report_empty() {
        let report = SyncService::build_report(Vec::new());
        assert!(report.success);
        assert_eq!(report.total, 0);
    }
}
