use crate::config::Settings;
use crate::db::DorisClient;
use crate::generators::DorisDDLGenerator;
use crate::models::ColumnMeta;
use crate::utils::error::{AppError, Result};
use crate::utils::identifier;
use crate::utils::type_mapper::TypeMapper;

/// 目标表结构对齐
/// 每次同步运行都是全量替换：表不存在就建，存在就清空或重建
pub struct SchemaReconciler<'a> {
    client: &'a DorisClient,
    settings: &'a Settings,
}

impl<'a> SchemaReconciler<'a> {
    pub fn new(client: &'a DorisClient, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// 确保目标表就绪，返回本次是否新建/重建了表
    /// 只在首批数据上调用一次，列集合在一次运行中不变
    pub async fn ensure_target_table(
        &self,
        target_table: &str,
        columns: &[ColumnMeta],
    ) -> Result<bool> {
        identifier::validate(target_table)?;
        for column in columns {
            identifier::validate(&column.name)?;
        }

        // 列数检查放在任何 DDL 之前，超限时目标端不留半成品
        if columns.len() > self.settings.max_columns {
            return Err(AppError::ColumnLimit(format!(
                "Source table has {} columns, exceeding the limit of {}",
                columns.len(),
                self.settings.max_columns
            )));
        }
        if columns.is_empty() {
            return Err(AppError::Query(
                "Cannot create target table without columns".to_string(),
            ));
        }

        let inferred: Vec<(String, String)> = columns
            .iter()
            .map(|c| (c.name.clone(), TypeMapper::doris_type(c.kind).to_string()))
            .collect();
        let database = self.client.database();

        if !self.client.table_exists(target_table).await? {
            tracing::info!("Creating target table `{}`.`{}`", database, target_table);
            let ddl =
                DorisDDLGenerator::generate_create_table_ddl(database, target_table, &inferred)?;
            self.client.execute(&ddl).await?;
            return Ok(true);
        }

        let existing = self.client.describe_table(target_table).await?;
        if existing.len() == columns.len() {
            // 列数一致：清空重灌。TRUNCATE 偶发失败时退回 DELETE 全表。
            tracing::info!("Truncating target table `{}`", target_table);
            let truncate = DorisDDLGenerator::generate_truncate_table_ddl(database, target_table);
            if let Err(e) = self.client.execute(&truncate).await {
                tracing::warn!(
                    "TRUNCATE failed on `{}`, falling back to DELETE: {}",
                    target_table,
                    e
                );
                let delete_all = DorisDDLGenerator::generate_delete_all_dml(database, target_table);
                self.client.execute(&delete_all).await?;
            }
            Ok(false)
        } else {
            // 列数不一致：不做部分迁移，直接重建
            tracing::info!(
                "Target table `{}` has {} columns but source has {}, rebuilding",
                target_table,
                existing.len(),
                columns.len()
            );
            self.client
                .execute(&DorisDDLGenerator::generate_drop_table_ddl(
                    database,
                    target_table,
                ))
                .await?;
            let ddl =
                DorisDDLGenerator::generate_create_table_ddl(database, target_table, &inferred)?;
            self.client.execute(&ddl).await?;
            Ok(true)
        }
    }
}
