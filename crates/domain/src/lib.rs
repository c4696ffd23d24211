//! 博客发布系统核心领域模型
//!
//! 包含文章、评论等核心实体，以及相关的校验规则、分页规则和仓储接口。

pub mod business_rules;
pub mod entities;
pub mod errors;
pub mod repositories;
pub mod value_objects;

// 重新导出常用类型
pub use business_rules::*;
pub use entities::*;
pub use errors::*;
pub use repositories::*;
pub use value_objects::*;
