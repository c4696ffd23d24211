//! 文章Repository接口定义

use async_trait::async_trait;

use crate::entities::post::{NewPost, Post};
use crate::errors::RepositoryResult;
use crate::repositories::Pagination;
use crate::value_objects::PostId;

/// 文章Repository接口
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// 创建文章并返回分配了ID的实体
    async fn create_post(&self, post: NewPost) -> RepositoryResult<Post>;

    /// 按发布时间倒序分页获取文章，每篇文章附带其评论
    async fn get_posts(&self, pagination: Pagination) -> RepositoryResult<Vec<Post>>;

    /// 根据ID查找文章（附带评论）
    async fn find_post_by_id(&self, id: PostId) -> RepositoryResult<Option<Post>>;
}
