use crate::utils::error::{AppError, Result};

/// Doris DDL 生成器
/// 调用方必须先对所有标识符做校验，这里只负责拼 SQL 文本
pub struct DorisDDLGenerator;

impl DorisDDLGenerator {
    /// 生成建表语句
    /// 第一列作为 DUPLICATE KEY 和分桶列，固定 10 个桶；列表不能为空
    pub fn generate_create_table_ddl(
        database: &str,
        table: &str,
        columns: &[(String, String)],
    ) -> Result<String> {
        let key_column = match columns.first() {
            Some((name, _)) => name,
            None => {
                return Err(AppError::Query(format!(
                    "Cannot generate CREATE TABLE for `{}` without columns",
                    table
                )))
            }
        };

        let column_defs = columns
            .iter()
            .map(|(name, doris_type)| format!("    `{}` {}", name, doris_type))
            .collect::<Vec<_>>()
            .join(",\n");

        Ok(format!(
            r#"CREATE TABLE IF NOT EXISTS `{}`.`{}` (
{}
)
DUPLICATE KEY(`{}`)
DISTRIBUTED BY HASH(`{}`) BUCKETS 10
PROPERTIES (
    "replication_num" = "1"
)"#,
            database, table, column_defs, key_column, key_column
        ))
    }

    pub fn generate_drop_table_ddl(database: &str, table: &str) -> String {
        format!("DROP TABLE IF EXISTS `{}`.`{}`", database, table)
    }

    pub fn generate_truncate_table_ddl(database: &str, table: &str) -> String {
        format!("TRUNCATE TABLE `{}`.`{}`", database, table)
    }

    /// TRUNCATE 不可用时的兜底清空语句
    pub fn generate_delete_all_dml(database: &str, table: &str) -> String {
        format!("DELETE FROM `{}`.`{}` WHERE true", database, table)
    }

    pub fn generate_create_database_ddl(database: &str) -> String {
        format!("CREATE DATABASE IF NOT EXISTS `{}`", database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_columns() -> Vec<(String, String)> {
        vec![
            ("id".to_string(), "BIGINT".to_string()),
            ("amount".to_string(), "DECIMAL(18,2)".to_string()),
            ("created_at".to_string(), "DATETIME".to_string()),
            ("remark".to_string(), "VARCHAR(500)".to_string()),
        ]
    }

    #[test]
    fn test_generate_create_table_ddl() {
        let ddl =
            DorisDDLGenerator::generate_create_table_ddl("test_db", "orders", &sample_columns())
                .unwrap();

        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS `test_db`.`orders`"));
        assert!(ddl.contains("`id` BIGINT"));
        assert!(ddl.contains("`amount` DECIMAL(18,2)"));
        assert!(ddl.contains("`created_at` DATETIME"));
        assert!(ddl.contains("`remark` VARCHAR(500)"));
        // 第一列作为重复键和分桶列
        assert!(ddl.contains("DUPLICATE KEY(`id`)"));
        assert!(ddl.contains("DISTRIBUTED BY HASH(`id`) BUCKETS 10"));
        assert!(ddl.contains(r#""replication_num" = "1""#));
    }

    #[test]
    fn test_empty_column_list_is_an_error() {
        let result = DorisDDLGenerator::generate_create_table_ddl("test_db", "orders", &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_column_order_preserved() {
        let ddl =
            DorisDDLGenerator::generate_create_table_ddl("test_db", "orders", &sample_columns())
                .unwrap();
        let id_pos = ddl.find("`id`").unwrap();
        let amount_pos = ddl.find("`amount`").unwrap();
        let created_pos = ddl.find("`created_at`").unwrap();
        assert!(id_pos < amount_pos);
        assert!(amount_pos < created_pos);
    }

    #[test]
    fn test_generate_drop_and_truncate() {
        assert_eq!(
            DorisDDLGenerator::generate_drop_table_ddl("test_db", "orders"),
            "DROP TABLE IF EXISTS `test_db`.`orders`"
        );
        assert_eq!(
            DorisDDLGenerator::generate_truncate_table_ddl("test_db", "orders"),
            "TRUNCATE TABLE `test_db`.`orders`"
        );
        assert_eq!(
            DorisDDLGenerator::generate_delete_all_dml("test_db", "orders"),
            "DELETE FROM `test_db`.`orders` WHERE true"
        );
    }
}
