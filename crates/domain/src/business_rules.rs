//! 业务规则验证
//!
//! 文章与评论文本的长度校验。长度按 Unicode 字符计数而不是字节。

use crate::errors::{DomainError, DomainResult};

/// 文本内容规则
pub struct TextRules;

impl TextRules {
    /// 验证文本非空且不超过 `max_chars` 个字符
    pub fn validate(field: &str, value: &str, max_chars: usize) -> DomainResult<()> {
        if value.trim().is_empty() {
            return Err(DomainError::validation_error(field, "不能为空"));
        }

        let length = value.chars().count();
        if length > max_chars {
            return Err(DomainError::validation_error(
                field,
                format!("长度 {length} 超过上限 {max_chars}"),
            ));
        }

        Ok(())
    }
}
