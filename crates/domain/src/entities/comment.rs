//! 评论实体定义

use serde::{Deserialize, Serialize};

use crate::value_objects::{AuthorId, CommentId, PostId, Timestamp};

/// 待持久化的评论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,
    pub author_id: AuthorId,
    /// 父评论，None 表示顶层评论
    pub parent_id: Option<CommentId>,
    pub published_at: Timestamp,
}

impl NewComment {
    pub fn with_id(self, id: CommentId) -> Comment {
        Comment {
            id,
            post_id: self.post_id,
            content: self.content,
            author_id: self.author_id,
            parent_id: self.parent_id,
            published_at: self.published_at,
        }
    }
}

/// 评论实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// 所属文章，创建后不可变
    pub post_id: PostId,
    pub content: String,
    pub author_id: AuthorId,
    pub parent_id: Option<CommentId>,
    pub published_at: Timestamp,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}
