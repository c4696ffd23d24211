use std::sync::Arc;

use application::{CommentService, PostService};

use crate::schema::{build_schema, AppSchema};

#[derive(Clone)]
pub struct AppState {
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub schema: AppSchema,
    /// 是否在 `/` 提供 GraphiQL
    pub playground: bool,
}

impl AppState {
    pub fn new(
        post_service: Arc<PostService>,
        comment_service: Arc<CommentService>,
        playground: bool,
    ) -> Self {
        let schema = build_schema(post_service.clone(), comment_service.clone());
        Self {
            post_service,
            comment_service,
            schema,
            playground,
        }
    }
}
