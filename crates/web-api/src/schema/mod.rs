//! GraphQL schema：文章与评论的查询、变更，以及新评论订阅

mod mutation;
mod query;
mod subscription;
mod types;

use std::sync::Arc;

use application::{CommentService, PostService};
use async_graphql::Schema;
use tracing::{info_span, Span};
use uuid::Uuid;

pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;
pub use types::{CommentObject, PostObject};

pub type AppSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(
    post_service: Arc<PostService>,
    comment_service: Arc<CommentService>,
) -> AppSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        SubscriptionRoot::default(),
    )
    .data(post_service)
    .data(comment_service)
    .finish()
}

/// 每个 GraphQL 操作一个 span，携带新生成的请求ID
pub(crate) fn request_span() -> Span {
    let request_id = Uuid::new_v4();
    info_span!("graphql", %request_id)
}
