use std::sync::Arc;

use application::{CommentService, PostService};
use async_graphql::{Context, Object, Result};

use super::types::{CommentObject, PostObject};
use crate::error::graphql_error;

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// 文章列表，最新发布的在前；页码从 1 开始
    async fn posts(
        &self,
        ctx: &Context<'_>,
        page: Option<i64>,
        amount: Option<i64>,
    ) -> Result<Vec<PostObject>> {
        let service = ctx.data::<Arc<PostService>>()?;
        let posts = service
            .get_posts(page, amount)
            .await
            .map_err(graphql_error)?;
        Ok(posts.into_iter().map(PostObject::from).collect())
    }

    async fn post(&self, ctx: &Context<'_>, id: i64) -> Result<PostObject> {
        let service = ctx.data::<Arc<PostService>>()?;
        let post = service.get_post_by_id(id).await.map_err(graphql_error)?;
        Ok(PostObject::from(post))
    }

    /// 某篇文章的评论，按发布顺序；页码从 1 开始
    async fn comments(
        &self,
        ctx: &Context<'_>,
        post_id: i64,
        page: Option<i64>,
        amount: Option<i64>,
    ) -> Result<Vec<CommentObject>> {
        let service = ctx.data::<Arc<CommentService>>()?;
        let comments = service
            .get_comments_by_post_id(post_id, page, amount)
            .await
            .map_err(graphql_error)?;
        Ok(comments.into_iter().map(CommentObject::from).collect())
    }
}
