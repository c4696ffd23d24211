use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    AuthorId, Comment, CommentId, CommentRepository, NewComment, NewPost, Pagination, Post, PostId,
    PostRepository, RepositoryError, RepositoryResult,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::{debug, info};

use crate::retry::{retry_async, RetryConfig};

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn to_sql_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Debug, FromRow)]
struct PostRecord {
    id: i64,
    title: String,
    content: String,
    author_id: i64,
    commentable: bool,
    published_at: DateTime<Utc>,
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Post {
            id: PostId(value.id),
            title: value.title,
            content: value.content,
            author_id: AuthorId(value.author_id),
            commentable: value.commentable,
            published_at: value.published_at,
            comments: Vec::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRecord {
    id: i64,
    post_id: i64,
    author_id: i64,
    content: String,
    parent_comment_id: Option<i64>,
    published_at: DateTime<Utc>,
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Comment {
            id: CommentId(value.id),
            post_id: PostId(value.post_id),
            content: value.content,
            author_id: AuthorId(value.author_id),
            parent_id: value.parent_comment_id.map(CommentId),
            published_at: value.published_at,
        }
    }
}

const POST_COLUMNS: &str = "id, title, content, author_id, commentable, published_at";
const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, content, parent_comment_id, published_at";

#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 一次查询取回多篇文章的评论，按文章分组，组内按ID升序
    async fn comments_for(
        &self,
        post_ids: &[i64],
    ) -> RepositoryResult<HashMap<PostId, Vec<Comment>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ANY($1) ORDER BY post_id, id"
        ))
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let mut grouped: HashMap<PostId, Vec<Comment>> = HashMap::new();
        for record in records {
            let comment = Comment::from(record);
            grouped.entry(comment.post_id).or_default().push(comment);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create_post(&self, post: NewPost) -> RepositoryResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            r#"
            INSERT INTO posts (title, content, author_id, commentable, published_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.author_id.0)
        .bind(post.commentable)
        .bind(post.published_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        debug!(post_id = record.id, store = "postgres", "create_post");
        Ok(Post::from(record))
    }

    async fn get_posts(&self, pagination: Pagination) -> RepositoryResult<Vec<Post>> {
        debug!(
            offset = pagination.offset,
            limit = pagination.limit,
            store = "postgres",
            "get_posts"
        );

        let records = sqlx::query_as::<_, PostRecord>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            ORDER BY published_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(to_sql_i64(pagination.limit))
        .bind(to_sql_i64(pagination.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
        let mut comments = self.comments_for(&ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let mut post = Post::from(record);
                post.comments = comments.remove(&post.id).unwrap_or_default();
                post
            })
            .collect())
    }

    async fn find_post_by_id(&self, id: PostId) -> RepositoryResult<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let Some(record) = record else {
            return Ok(None);
        };

        let mut post = Post::from(record);
        post.comments = self
            .comments_for(&[id.0])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(post))
    }
}

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<Comment> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        // 锁住文章行，防止与关闭评论的并发修改交错
        let commentable: Option<bool> =
            sqlx::query_scalar("SELECT commentable FROM posts WHERE id = $1 FOR SHARE")
                .bind(comment.post_id.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;

        match commentable {
            None => return Err(RepositoryError::PostNotFound(comment.post_id)),
            Some(false) => return Err(RepositoryError::NotCommentable(comment.post_id)),
            Some(true) => {}
        }

        if let Some(parent_id) = comment.parent_id {
            let parent_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1 AND post_id = $2)",
            )
            .bind(parent_id.0)
            .bind(comment.post_id.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

            if !parent_exists {
                return Err(RepositoryError::CommentNotFound(parent_id));
            }
        }

        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            r#"
            INSERT INTO comments (post_id, author_id, content, parent_comment_id, published_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment.post_id.0)
        .bind(comment.author_id.0)
        .bind(&comment.content)
        .bind(comment.parent_id.map(|id| id.0))
        .bind(comment.published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        debug!(
            comment_id = record.id,
            post_id = record.post_id,
            store = "postgres",
            "create_comment"
        );
        Ok(Comment::from(record))
    }

    async fn get_comments_by_post_id(
        &self,
        post_id: PostId,
        pagination: Pagination,
    ) -> RepositoryResult<Vec<Comment>> {
        debug!(
            %post_id,
            offset = pagination.offset,
            limit = pagination.limit,
            store = "postgres",
            "get_comments_by_post_id"
        );

        let post_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
                .bind(post_id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        if !post_exists {
            return Err(RepositoryError::PostNotFound(post_id));
        }

        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(post_id.0)
        .bind(to_sql_i64(pagination.limit))
        .bind(to_sql_i64(pagination.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Comment::from).collect())
    }
}

/// PostgreSQL 存储，持有连接池和两个仓储
pub struct PgStorage {
    pub pool: PgPool,
    pub post_repository: Arc<PgPostRepository>,
    pub comment_repository: Arc<PgCommentRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            post_repository: Arc::new(PgPostRepository::new(pool.clone())),
            comment_repository: Arc::new(PgCommentRepository::new(pool.clone())),
            pool,
        }
    }
}

/// 建立连接池，失败时每隔 `connect_timeout` 重试，最多 `connect_attempts` 次
pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
    connect_attempts: u32,
    connect_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let retry = RetryConfig {
        max_attempts: connect_attempts,
        delay: connect_timeout,
    };

    let pool = retry_async(retry, || {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout.max(Duration::from_secs(1)))
            .connect(database_url)
    })
    .await?;

    info!(max_connections, "PostgreSQL 连接池已建立");
    Ok(pool)
}
