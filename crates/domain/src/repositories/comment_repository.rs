//! 评论Repository接口定义

use async_trait::async_trait;

use crate::entities::comment::{Comment, NewComment};
use crate::errors::RepositoryResult;
use crate::repositories::Pagination;
use crate::value_objects::PostId;

/// 评论Repository接口
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// 保存评论
    ///
    /// 文章不存在时返回 `PostNotFound`，文章关闭评论时返回 `NotCommentable`；
    /// 指定了父评论时，父评论必须存在且属于同一篇文章，否则返回 `CommentNotFound`。
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<Comment>;

    /// 按发布顺序分页获取文章的评论
    async fn get_comments_by_post_id(
        &self,
        post_id: PostId,
        pagination: Pagination,
    ) -> RepositoryResult<Vec<Comment>>;
}
