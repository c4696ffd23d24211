use std::sync::Arc;

use config::PostConfig;
use domain::{AuthorId, NewPost, PagePolicy, Pagination, Post, PostId, PostRepository, TextRules};
use tracing::{debug, info};

use crate::{clock::Clock, error::ApplicationError};

#[derive(Debug, Clone)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub commentable: bool,
}

pub struct PostServiceDependencies {
    pub post_repository: Arc<dyn PostRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: PostConfig,
}

pub struct PostService {
    deps: PostServiceDependencies,
}

impl PostService {
    pub fn new(deps: PostServiceDependencies) -> Self {
        Self { deps }
    }

    fn page_policy(&self) -> PagePolicy {
        PagePolicy {
            default_page: self.deps.config.default_page,
            default_amount: self.deps.config.default_amount,
            max_amount: self.deps.config.max_amount,
        }
    }

    /// 创建文章，标题和正文在写入前校验
    #[tracing::instrument(skip(self, request), fields(author_id = request.author_id))]
    pub async fn create_post(&self, request: CreatePostRequest) -> Result<Post, ApplicationError> {
        TextRules::validate(
            "title",
            &request.title,
            self.deps.config.title_max_characters,
        )?;
        TextRules::validate(
            "content",
            &request.content,
            self.deps.config.content_max_characters,
        )?;

        let post = NewPost {
            title: request.title,
            content: request.content,
            author_id: AuthorId(request.author_id),
            commentable: request.commentable,
            published_at: self.deps.clock.now(),
        };
        let stored = self.deps.post_repository.create_post(post).await?;
        info!(post_id = %stored.id, "文章已创建");
        Ok(stored)
    }

    /// 分页获取文章，最新发布的在前
    #[tracing::instrument(skip(self))]
    pub async fn get_posts(
        &self,
        page: Option<i64>,
        amount: Option<i64>,
    ) -> Result<Vec<Post>, ApplicationError> {
        let pagination = Pagination::resolve(page, amount, self.page_policy());
        let posts = self.deps.post_repository.get_posts(pagination).await?;
        debug!(count = posts.len(), page = pagination.page, "查询文章列表");
        Ok(posts)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_post_by_id(&self, id: i64) -> Result<Post, ApplicationError> {
        let post_id = PostId(id);
        self.deps
            .post_repository
            .find_post_by_id(post_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(format!("post {post_id}")))
    }
}
