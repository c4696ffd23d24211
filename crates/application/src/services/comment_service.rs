use std::sync::Arc;

use config::{BrokerConfig, CommentConfig};
use domain::{
    AuthorId, Comment, CommentId, CommentRepository, NewComment, PagePolicy, Pagination, PostId,
    TextRules,
};
use tracing::{debug, info};

use crate::{
    broker::{BrokerStats, CommentBroker, CommentStream, SubscriptionId},
    clock::Clock,
    error::ApplicationError,
};

#[derive(Debug, Clone)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub content: String,
    pub author_id: i64,
    /// None 表示顶层评论
    pub parent_id: Option<i64>,
}

pub struct CommentServiceDependencies {
    pub comment_repository: Arc<dyn CommentRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: CommentConfig,
    pub broker: BrokerConfig,
}

/// 评论用例服务，持有评论广播中心
pub struct CommentService {
    comment_repository: Arc<dyn CommentRepository>,
    clock: Arc<dyn Clock>,
    config: CommentConfig,
    broker: CommentBroker,
}

impl CommentService {
    /// 创建服务并启动广播中心，必须在 tokio 运行时中调用
    pub fn new(deps: CommentServiceDependencies) -> Self {
        Self {
            comment_repository: deps.comment_repository,
            clock: deps.clock,
            config: deps.config,
            broker: CommentBroker::spawn(deps.broker),
        }
    }

    fn page_policy(&self) -> PagePolicy {
        PagePolicy {
            default_page: self.config.default_page,
            default_amount: self.config.default_amount,
            max_amount: self.config.max_amount,
        }
    }

    /// 校验并保存评论，保存成功后推送给该文章的订阅者
    ///
    /// 校验失败时不会访问仓储；保存失败时不会推送。
    #[tracing::instrument(skip(self, request), fields(post_id = request.post_id))]
    pub async fn create_comment(
        &self,
        request: CreateCommentRequest,
    ) -> Result<Comment, ApplicationError> {
        TextRules::validate("content", &request.content, self.config.max_characters)?;

        let comment = NewComment {
            post_id: PostId(request.post_id),
            content: request.content,
            author_id: AuthorId(request.author_id),
            parent_id: request.parent_id.map(CommentId),
            published_at: self.clock.now(),
        };
        let stored = self.comment_repository.create_comment(comment).await?;
        info!(
            comment_id = %stored.id,
            top_level = stored.is_top_level(),
            "评论已保存"
        );

        self.broker.publish(stored.clone()).await;
        Ok(stored)
    }

    /// 按发布顺序分页获取评论
    #[tracing::instrument(skip(self))]
    pub async fn get_comments_by_post_id(
        &self,
        post_id: i64,
        page: Option<i64>,
        amount: Option<i64>,
    ) -> Result<Vec<Comment>, ApplicationError> {
        let pagination = Pagination::resolve(page, amount, self.page_policy());
        let comments = self
            .comment_repository
            .get_comments_by_post_id(PostId(post_id), pagination)
            .await?;
        debug!(count = comments.len(), page = pagination.page, "查询评论列表");
        Ok(comments)
    }

    #[tracing::instrument(skip(self))]
    pub async fn subscribe_comments(&self, post_id: i64) -> CommentStream {
        let stream = self.broker.subscribe(PostId(post_id)).await;
        debug!(subscription_id = %stream.id(), "订阅评论");
        stream
    }

    #[tracing::instrument(skip(self))]
    pub async fn unsubscribe_comments(&self, id: SubscriptionId) {
        self.broker.unsubscribe(id).await;
    }

    pub async fn subscription_stats(&self) -> BrokerStats {
        self.broker.stats().await
    }

    /// 关闭所有评论流，进程退出前调用
    pub async fn shutdown(&self) {
        self.broker.shutdown().await;
    }
}
