//! 文章实体定义

use serde::{Deserialize, Serialize};

use crate::entities::comment::Comment;
use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{AuthorId, PostId, Timestamp};

/// 待持久化的文章，ID 由存储层分配。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: AuthorId,
    pub commentable: bool,
    pub published_at: Timestamp,
}

impl NewPost {
    /// 分配 ID 后得到完整的文章，评论列表为空。
    pub fn with_id(self, id: PostId) -> Post {
        Post {
            id,
            title: self.title,
            content: self.content,
            author_id: self.author_id,
            commentable: self.commentable,
            published_at: self.published_at,
            comments: Vec::new(),
        }
    }
}

/// 文章实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// 文章ID，创建后不可变
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: AuthorId,
    /// 为 false 时永久禁止新评论
    pub commentable: bool,
    pub published_at: Timestamp,
    /// 评论的冗余视图，按发布顺序排列，不作为权威数据
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// 检查文章是否允许追加评论
    pub fn ensure_commentable(&self) -> DomainResult<()> {
        if self.commentable {
            Ok(())
        } else {
            Err(DomainError::CommentsDisabled(self.id))
        }
    }
}
