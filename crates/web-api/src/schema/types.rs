use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use domain::{Comment, Post};

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "Post")]
pub struct PostObject {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub commentable: bool,
    pub published_at: DateTime<Utc>,
    pub comments: Vec<CommentObject>,
}

impl From<Post> for PostObject {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.0,
            title: post.title,
            content: post.content,
            author_id: post.author_id.0,
            commentable: post.commentable,
            published_at: post.published_at,
            comments: post.comments.into_iter().map(CommentObject::from).collect(),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "Comment")]
pub struct CommentObject {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub author_id: i64,
    /// 顶层评论为 null
    pub parent_comment_id: Option<i64>,
    pub published_at: DateTime<Utc>,
}

impl From<Comment> for CommentObject {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id.0,
            post_id: comment.post_id.0,
            content: comment.content,
            author_id: comment.author_id.0,
            parent_comment_id: comment.parent_id.map(|id| id.0),
            published_at: comment.published_at,
        }
    }
}
