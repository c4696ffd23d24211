use std::sync::Arc;

use application::{CommentService, CreateCommentRequest, CreatePostRequest, PostService};
use async_graphql::{Context, Object, Result};

use super::types::{CommentObject, PostObject};
use crate::error::graphql_error;

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_post(
        &self,
        ctx: &Context<'_>,
        title: String,
        content: String,
        author_id: i64,
        commentable: bool,
    ) -> Result<PostObject> {
        let service = ctx.data::<Arc<PostService>>()?;
        let post = service
            .create_post(CreatePostRequest {
                title,
                content,
                author_id,
                commentable,
            })
            .await
            .map_err(graphql_error)?;
        Ok(PostObject::from(post))
    }

    /// 发表评论，成功后推送给 `commentAdded` 的订阅者
    async fn add_comment(
        &self,
        ctx: &Context<'_>,
        post_id: i64,
        content: String,
        author_id: i64,
        parent_comment_id: Option<i64>,
    ) -> Result<CommentObject> {
        let service = ctx.data::<Arc<CommentService>>()?;
        let comment = service
            .create_comment(CreateCommentRequest {
                post_id,
                content,
                author_id,
                parent_id: parent_comment_id,
            })
            .await
            .map_err(graphql_error)?;
        Ok(CommentObject::from(comment))
    }
}
