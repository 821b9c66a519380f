use crate::models::ColumnKind;

/// 源列类型到 Doris 列类型的推断
pub struct TypeMapper;

impl TypeMapper {
    /// 将源表（MySQL）列类型归类
    pub fn kind_from_source_type(source_type: &str) -> ColumnKind {
        let upper = source_type.to_uppercase();
        let base = upper.split('(').next().unwrap_or(&upper).trim();

        match base {
            // 整数类型
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR"
            | "BIT" => ColumnKind::Integer,

            // 浮点类型
            "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "DECIMAL" | "NUMERIC" | "REAL" => {
                ColumnKind::Decimal
            }

            // 日期时间类型
            "DATETIME" | "TIMESTAMP" | "DATE" => ColumnKind::DateTime,

            // 其余全部按文本处理
            _ => ColumnKind::Text,
        }
    }

    /// ColumnKind 到 Doris 类型
    pub fn doris_type(kind: ColumnKind) -> &'static str {
        match kind {
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Decimal => "DECIMAL(18,2)",
            ColumnKind::DateTime => "DATETIME",
            ColumnKind::Text => "VARCHAR(500)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_source_type() {
        assert_eq!(
            TypeMapper::kind_from_source_type("INT"),
            ColumnKind::Integer
        );
        assert_eq!(
            TypeMapper::kind_from_source_type("bigint"),
            ColumnKind::Integer
        );
        assert_eq!(
            TypeMapper::kind_from_source_type("DECIMAL(10,2)"),
            ColumnKind::Decimal
        );
        assert_eq!(
            TypeMapper::kind_from_source_type("DATETIME"),
            ColumnKind::DateTime
        );
        assert_eq!(
            TypeMapper::kind_from_source_type("VARCHAR(255)"),
            ColumnKind::Text
        );
        assert_eq!(TypeMapper::kind_from_source_type("JSON"), ColumnKind::Text);
    }

    #[test]
    fn test_doris_type() {
        assert_eq!(TypeMapper::doris_type(ColumnKind::Integer), "BIGINT");
        assert_eq!(TypeMapper::doris_type(ColumnKind::Decimal), "DECIMAL(18,2)");
        assert_eq!(TypeMapper::doris_type(ColumnKind::DateTime), "DATETIME");
        assert_eq!(TypeMapper::doris_type(ColumnKind::Text), "VARCHAR(500)");
    }
}
