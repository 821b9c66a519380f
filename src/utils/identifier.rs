use crate::utils::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// 所有表名/列名在拼入 SQL 文本之前必须通过这个检查,
// 这是系统唯一的 SQL 注入防线
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-\u{4e00}-\u{9fff}]+$").unwrap());

/// 校验标识符（表名/列名）是否合法
pub fn validate(name: &str) -> Result<&str> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(name)
    } else {
        Err(AppError::InvalidIdentifier(format!(
            "Identifier '{}' contains illegal characters",
            name
        )))
    }
}

/// 规范化列名：空格和连字符替换为下划线
pub fn normalize_column(name: &str) -> String {
    name.replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_plain_names() {
        assert!(validate("orders_2024").is_ok());
        assert!(validate("order-id").is_ok());
        assert!(validate("订单表").is_ok());
    }

    #[test]
    fn test_validate_rejects_injection() {
        assert!(validate("orders; DROP TABLE x").is_err());
        assert!(validate("a`b").is_err());
        assert!(validate("").is_err());
        assert!(validate("a b").is_err());
    }

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column("order id"), "order_id");
        assert_eq!(normalize_column("order-id"), "order_id");
        assert_eq!(normalize_column("order_id"), "order_id");
    }
}
