//! Repository接口定义
//!
//! 定义数据访问层的抽象接口，内层定义接口，外层（内存存储、PostgreSQL）实现接口。

use std::ops::Range;

pub mod comment_repository;
pub mod post_repository;

pub use comment_repository::CommentRepository;
pub use post_repository::PostRepository;

#[cfg(any(test, feature = "testing"))]
pub use comment_repository::MockCommentRepository;
#[cfg(any(test, feature = "testing"))]
pub use post_repository::MockPostRepository;

/// 分页默认值与上限，按资源分别配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    pub default_page: u32,
    pub default_amount: u32,
    pub max_amount: u32,
}

/// 分页参数
///
/// 页码从 1 开始：`offset = (page - 1) * page_size`。文章与评论列表共用同一规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        let offset = u64::from(page - 1) * u64::from(page_size);
        let limit = u64::from(page_size);
        Self {
            page,
            page_size,
            offset,
            limit,
        }
    }

    /// 将调用方可选的页码/条数解析为分页参数
    ///
    /// 缺省值或小于 1 的显式值都视为未设置，使用策略中的默认值；条数不超过 `max_amount`。
    pub fn resolve(page: Option<i64>, amount: Option<i64>, policy: PagePolicy) -> Self {
        let page = explicit(page).unwrap_or(policy.default_page);
        let amount = explicit(amount)
            .unwrap_or(policy.default_amount)
            .min(policy.max_amount);
        Self::new(page, amount)
    }

    /// 对长度为 `len` 的有序集合计算本页的下标区间，越界时返回空区间
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX).min(len);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let end = start.saturating_add(limit).min(len);
        start..end
    }
}

fn explicit(value: Option<i64>) -> Option<u32> {
    value
        .filter(|v| *v >= 1)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}
