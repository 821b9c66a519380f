use serde::{Deserialize, Serialize};

/// 一次 Stream Load 调用的结果；多次调用的结果可合并
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadResult {
    pub success: bool,
    pub rows_loaded: u64,
    pub rows_total: u64,
    pub rows_filtered: u64,
    pub bytes_loaded: u64,
}

impl LoadResult {
    /// 合并两次加载的结果：计数相加，全部成功才算成功
    pub fn merge(&self, other: &LoadResult) -> LoadResult {
        LoadResult {
            success: self.success && other.success,
            rows_loaded: self.rows_loaded + other.rows_loaded,
            rows_total: self.rows_total + other.rows_total,
            rows_filtered: self.rows_filtered + other.rows_filtered,
            bytes_loaded: self.bytes_loaded + other.bytes_loaded,
        }
    }

    /// 把新结果累积进可选的汇总里
    pub fn accumulate(acc: Option<LoadResult>, next: LoadResult) -> LoadResult {
        match acc {
            Some(prev) => prev.merge(&next),
            None => next,
        }
    }
}

/// 单表同步结果
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub source_table: String,
    pub target_table: String,
    pub success: bool,
    pub rows_synced: u64,
    pub table_created: bool,
    pub error: Option<String>,
    pub load_result: Option<LoadResult>,
}

impl SyncOutcome {
    pub fn failure(source_table: &str, target_table: &str, error: String) -> Self {
        Self {
            source_table: source_table.to_string(),
            target_table: target_table.to_string(),
            success: false,
            rows_synced: 0,
            table_created: false,
            error: Some(error),
            load_result: None,
        }
    }
}

/// 批量同步报告
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub total: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub error: Option<String>,
    pub results: Vec<SyncOutcome>,
}

/// 单表同步请求
#[derive(Debug, Clone, Deserialize)]
pub struct SyncTableRequest {
    pub source_table: String,
    pub target_table: Option<String>,
}

/// 批量同步请求
#[derive(Debug, Clone, Deserialize)]
pub struct SyncMultipleRequest {
    pub tables: Vec<SyncTableRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_counts() {
        let a = LoadResult {
            success: true,
            rows_loaded: 10,
            rows_total: 10,
            rows_filtered: 0,
            bytes_loaded: 100,
        };
        let b = LoadResult {
            success: true,
            rows_loaded: 4,
            rows_total: 5,
            rows_filtered: 1,
            bytes_loaded: 50,
        };

        let merged = a.merge(&b);
        assert!(merged.success);
        assert_eq!(merged.rows_loaded, 14);
        assert_eq!(merged.rows_total, 15);
        assert_eq!(merged.rows_filtered, 1);
        assert_eq!(merged.bytes_loaded, 150);
    }

    #[test]
    fn test_merge_any_failure_fails() {
        let ok = LoadResult {
            success: true,
            ..Default::default()
        };
        let bad = LoadResult {
            success: false,
            ..Default::default()
        };
        assert!(!ok.merge(&bad).success);
        assert!(!bad.merge(&ok).success);
    }

    #[test]
    fn test_accumulate_from_empty() {
        let first = LoadResult {
            success: true,
            rows_total: 3,
            ..Default::default()
        };
        let merged = LoadResult::accumulate(None, first.clone());
        assert_eq!(merged.rows_total, 3);

        let merged = LoadResult::accumulate(Some(merged), first);
        assert_eq!(merged.rows_total, 6);
    }
}
