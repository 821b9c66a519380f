use crate::config::Settings;
use crate::models::{LoadResult, RowBatch};
use crate::utils::error::{AppError, Result};
use crate::utils::identifier;
use serde::Deserialize;

/// Stream Load 端点的 JSON 响应体
/// 字段不全时按 0 处理，只有 Status 决定成败
#[derive(Debug, Deserialize)]
struct StreamLoadResponse {
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "NumberTotalRows", default)]
    number_total_rows: u64,
    #[serde(rename = "NumberLoadedRows", default)]
    number_loaded_rows: u64,
    #[serde(rename = "NumberFilteredRows", default)]
    number_filtered_rows: u64,
    #[serde(rename = "LoadBytes", default)]
    load_bytes: u64,
}

/// Stream Load 加载器
/// 行数和字节数双重上限：先按行切分，超出字节上限的片段再对半细分
pub struct StreamLoader {
    client: reqwest::Client,
    base_url: String,
    database: String,
    user: String,
    password: String,
    max_rows: usize,
    max_bytes: usize,
}

impl StreamLoader {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.load_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.stream_load_base(),
            database: settings.doris_database.clone(),
            user: settings.doris_user.clone(),
            password: settings.doris_password.clone(),
            max_rows: settings.load_max_rows,
            max_bytes: settings.load_max_bytes,
        })
    }

    /// 把一批数据加载进目标表，必要时拆成多次调用，结果合并返回
    pub async fn load_batch(&self, target_table: &str, batch: &RowBatch) -> Result<LoadResult> {
        identifier::validate(target_table)?;

        let mut merged: Option<LoadResult> = None;
        for (start, end) in plan_loads(&batch.rows, self.max_rows, self.max_bytes) {
            let payload = serialize_rows(&batch.rows[start..end]);
            let result = self.put_payload(target_table, payload).await?;
            merged = Some(LoadResult::accumulate(merged, result));
        }

        Ok(merged.unwrap_or(LoadResult {
            success: true,
            ..Default::default()
        }))
    }

    async fn put_payload(&self, table: &str, payload: String) -> Result<LoadResult> {
        let url = format!(
            "{}/api/{}/{}/_stream_load",
            self.base_url,
            urlencoding::encode(&self.database),
            urlencoding::encode(table)
        );

        tracing::debug!(
            "Stream Load PUT {} ({} bytes)",
            url,
            payload.len()
        );

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Expect", "100-continue")
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("format", "csv")
            .header("column_separator", "\\t")
            .header("strict_mode", "false")
            .header("max_filter_ratio", "0.1")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // 失败时保留服务端原始响应，行号和原因都在里面
        if status != reqwest::StatusCode::OK {
            return Err(AppError::Load(format!(
                "Stream Load returned HTTP {}: {}",
                status, body
            )));
        }

        let parsed: StreamLoadResponse = serde_json::from_str(&body)
            .map_err(|_| AppError::Load(format!("Unparseable Stream Load response: {}", body)))?;
        if parsed.status != "Success" {
            return Err(AppError::Load(format!("Stream Load failed: {}", body)));
        }

        if parsed.number_filtered_rows > 0 {
            tracing::warn!(
                "Stream Load into `{}` filtered {} of {} rows",
                table,
                parsed.number_filtered_rows,
                parsed.number_total_rows
            );
        }

        Ok(LoadResult {
            success: true,
            rows_loaded: parsed.number_loaded_rows,
            rows_total: parsed.number_total_rows,
            rows_filtered: parsed.number_filtered_rows,
            bytes_loaded: parsed.load_bytes,
        })
    }
}

/// 序列化为 TSV 文本，每行以 \n 结尾
fn serialize_rows(rows: &[Vec<Option<String>>]) -> String {
    let mut out = String::new();
    for row in rows {
        let mut first = true;
        for cell in row {
            if !first {
                out.push('\t');
            }
            first = false;
            push_sanitized(&mut out, cell);
        }
        out.push('\n');
    }
    out
}

/// 单元格清洗：NULL/NaN 变空串，内嵌的制表符和换行替换为空格
fn push_sanitized(out: &mut String, cell: &Option<String>) {
    let value = match cell {
        None => return,
        Some(v) if v == "NaN" => return,
        Some(v) => v,
    };
    for ch in value.chars() {
        out.push(match ch {
            '\t' | '\r' | '\n' => ' ',
            c => c,
        });
    }
}

/// 加载计划：先按行数上限切段，超出字节上限的段再对半细分
fn plan_loads(
    rows: &[Vec<Option<String>>],
    max_rows: usize,
    max_bytes: usize,
) -> Vec<(usize, usize)> {
    let max_rows = max_rows.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let end = (start + max_rows).min(rows.len());
        for (s, e) in split_ranges(&rows[start..end], max_bytes) {
            ranges.push((start + s, start + e));
        }
        start = end;
    }
    ranges
}

/// 把行切成序列化后不超过 max_bytes 的连续区间
/// 显式工作栈做对半细分；单行超限时原样放行，交给服务端裁决
fn split_ranges(rows: &[Vec<Option<String>>], max_bytes: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    if rows.is_empty() {
        return ranges;
    }

    let mut stack = vec![(0usize, rows.len())];
    while let Some((start, end)) = stack.pop() {
        let size = serialize_rows(&rows[start..end]).len();
        if size > max_bytes && end - start > 1 {
            let mid = start + (end - start) / 2;
            // 后半先入栈，出栈时保持原始行序
            stack.push((mid, end));
            stack.push((start, mid));
        } else {
            ranges.push((start, end));
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells.iter().map(|c| Some(c.to_string())).collect()
    }

    #[test]
    fn test_serialize_sanitizes_cells() {
        let rows = vec![vec![
            Some("a\tb".to_string()),
            None,
            Some("line1\nline2".to_string()),
            Some("NaN".to_string()),
            Some("cr\rend".to_string()),
        ]];
        assert_eq!(serialize_rows(&rows), "a b\t\tline1 line2\t\tcr end\n");
    }

    #[test]
    fn test_serialize_line_count_matches_rows() {
        let rows = vec![row(&["1", "x"]), row(&["2", "y"]), row(&["3", "z"])];
        let payload = serialize_rows(&rows);
        assert_eq!(payload.lines().count(), 3);
        assert!(payload.ends_with('\n'));
    }

    #[test]
    fn test_split_ranges_within_limit() {
        let rows: Vec<_> = (0..10).map(|i| row(&[&i.to_string(), "abc"])).collect();
        let ranges = split_ranges(&rows, 1_000_000);
        assert_eq!(ranges, vec![(0, 10)]);
    }

    #[test]
    fn test_split_ranges_respects_byte_limit() {
        let rows: Vec<_> = (0..16).map(|i| row(&[&format!("{:03}", i), "pad"])).collect();
        let max_bytes = 20;
        let ranges = split_ranges(&rows, max_bytes);

        // 区间首尾相接，覆盖全部行且保持顺序
        let mut cursor = 0;
        for &(start, end) in &ranges {
            assert_eq!(start, cursor);
            assert!(end > start);
            cursor = end;
        }
        assert_eq!(cursor, rows.len());

        // 多行区间不超过字节上限
        for &(start, end) in &ranges {
            if end - start > 1 {
                assert!(serialize_rows(&rows[start..end]).len() <= max_bytes);
            }
        }
    }

    #[test]
    fn test_split_ranges_single_oversized_row_passes() {
        let rows = vec![vec![Some("x".repeat(100))]];
        let ranges = split_ranges(&rows, 10);
        assert_eq!(ranges, vec![(0, 1)]);
    }

    #[test]
    fn test_plan_loads_row_ceiling() {
        // 10 行、每次最多 3 行 -> 4 段，每段不超过 3 行
        let rows: Vec<_> = (0..10).map(|i| row(&[&i.to_string()])).collect();
        let ranges = plan_loads(&rows, 3, usize::MAX);
        assert_eq!(ranges.len(), 4);
        let mut cursor = 0;
        for &(start, end) in &ranges {
            assert_eq!(start, cursor);
            assert!(end - start <= 3);
            cursor = end;
        }
        assert_eq!(cursor, 10);
    }

    #[test]
    fn test_plan_loads_combines_row_and_byte_limits() {
        let rows: Vec<_> = (0..8).map(|_| row(&["0123456789"])).collect();
        // 每行 11 字节：行数上限 4，字节上限 25 再把每段细分
        let ranges = plan_loads(&rows, 4, 25);
        let mut cursor = 0;
        for &(start, end) in &ranges {
            assert_eq!(start, cursor);
            assert!(end - start <= 4);
            if end - start > 1 {
                assert!(serialize_rows(&rows[start..end]).len() <= 25);
            }
            cursor = end;
        }
        assert_eq!(cursor, 8);
    }

    #[test]
    fn test_split_ranges_empty() {
        let rows: Vec<Vec<Option<String>>> = Vec::new();
        assert!(split_ranges(&rows, 100).is_empty());
    }
}
