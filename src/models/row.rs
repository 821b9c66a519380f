use serde::Serialize;
use std::sync::Arc;

/// 列值类别，从源表列类型归类而来
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "text")]
    Text,
}

/// 列元数据（名称已规范化）
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
}

/// 一批行数据
/// 有序、有限、不可重放；内存上限为单批大小（整表从不落入内存）
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub columns: Arc<Vec<ColumnMeta>>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
