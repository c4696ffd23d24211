use std::sync::Arc;

use application::CommentService;
use async_graphql::{Context, Result, Subscription};
use futures_util::stream::{Stream, StreamExt};
use tracing::Instrument;

use super::{request_span, types::CommentObject};

#[derive(Default)]
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// 订阅某篇文章的新评论，连接断开时自动退订
    async fn comment_added(
        &self,
        ctx: &Context<'_>,
        post_id: i64,
    ) -> Result<impl Stream<Item = CommentObject>> {
        let service = ctx.data::<Arc<CommentService>>()?.clone();
        let stream = service
            .subscribe_comments(post_id)
            .instrument(request_span())
            .await;
        Ok(stream.map(CommentObject::from))
    }
}
