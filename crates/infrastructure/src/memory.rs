//! 内存存储
//!
//! 进程内的文章/评论存储，启动时创建一次，由两个仓储通过 `Arc` 共享。
//! 重启后数据丢失，适合开发与测试。

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    Comment, CommentId, CommentRepository, NewComment, NewPost, Pagination, Post, PostId,
    PostRepository, RepositoryError, RepositoryResult,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    last_post_id: i64,
    last_comment_id: i64,
    /// 评论按ID升序保存在所属文章的 `comments` 中
    posts: BTreeMap<PostId, Post>,
    comment_posts: HashMap<CommentId, PostId>,
}

/// 共享的内存数据
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[derive(Clone)]
pub struct MemoryPostRepository {
    store: Arc<MemoryStore>,
}

impl MemoryPostRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create_post(&self, post: NewPost) -> RepositoryResult<Post> {
        let mut state = self.store.state.write().await;
        state.last_post_id += 1;
        let post = post.with_id(PostId(state.last_post_id));
        state.posts.insert(post.id, post.clone());
        debug!(post_id = %post.id, store = "memory", "create_post");
        Ok(post)
    }

    async fn get_posts(&self, pagination: Pagination) -> RepositoryResult<Vec<Post>> {
        let state = self.store.state.read().await;
        let mut posts: Vec<&Post> = state.posts.values().collect();
        posts.sort_by_key(|post| Reverse((post.published_at, post.id)));

        let range = pagination.bounds(posts.len());
        debug!(
            offset = pagination.offset,
            limit = pagination.limit,
            total = posts.len(),
            store = "memory",
            "get_posts"
        );
        Ok(posts[range].iter().map(|post| (*post).clone()).collect())
    }

    async fn find_post_by_id(&self, id: PostId) -> RepositoryResult<Option<Post>> {
        let state = self.store.state.read().await;
        Ok(state.posts.get(&id).cloned())
    }
}

#[derive(Clone)]
pub struct MemoryCommentRepository {
    store: Arc<MemoryStore>,
}

impl MemoryCommentRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<Comment> {
        let mut state = self.store.state.write().await;

        let post = state
            .posts
            .get(&comment.post_id)
            .ok_or(RepositoryError::PostNotFound(comment.post_id))?;
        post.ensure_commentable()
            .map_err(|_| RepositoryError::NotCommentable(comment.post_id))?;
        if let Some(parent_id) = comment.parent_id {
            if state.comment_posts.get(&parent_id) != Some(&comment.post_id) {
                return Err(RepositoryError::CommentNotFound(parent_id));
            }
        }

        state.last_comment_id += 1;
        let comment = comment.with_id(CommentId(state.last_comment_id));
        state.comment_posts.insert(comment.id, comment.post_id);
        if let Some(post) = state.posts.get_mut(&comment.post_id) {
            post.comments.push(comment.clone());
        }

        debug!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            store = "memory",
            "create_comment"
        );
        Ok(comment)
    }

    async fn get_comments_by_post_id(
        &self,
        post_id: PostId,
        pagination: Pagination,
    ) -> RepositoryResult<Vec<Comment>> {
        let state = self.store.state.read().await;
        let post = state
            .posts
            .get(&post_id)
            .ok_or(RepositoryError::PostNotFound(post_id))?;

        let range = pagination.bounds(post.comments.len());
        debug!(
            %post_id,
            offset = pagination.offset,
            limit = pagination.limit,
            store = "memory",
            "get_comments_by_post_id"
        );
        Ok(post.comments[range].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use domain::AuthorId;

    use super::*;

    fn repositories() -> (MemoryPostRepository, MemoryCommentRepository) {
        let store = MemoryStore::new();
        (
            MemoryPostRepository::new(store.clone()),
            MemoryCommentRepository::new(store),
        )
    }

    fn new_post(title: &str, commentable: bool, minutes: i64) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "body".to_string(),
            author_id: AuthorId(1),
            commentable,
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn new_comment(post_id: PostId, parent_id: Option<CommentId>) -> NewComment {
        NewComment {
            post_id,
            content: "nice".to_string(),
            author_id: AuthorId(2),
            parent_id,
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let (posts, comments) = repositories();
        let first = posts.create_post(new_post("a", true, 0)).await.unwrap();
        let second = posts.create_post(new_post("b", true, 1)).await.unwrap();
        assert_eq!((first.id, second.id), (PostId(1), PostId(2)));

        let c1 = comments.create_comment(new_comment(first.id, None)).await.unwrap();
        let c2 = comments.create_comment(new_comment(second.id, None)).await.unwrap();
        assert_eq!((c1.id, c2.id), (CommentId(1), CommentId(2)));
    }

    #[tokio::test]
    async fn test_posts_are_newest_first() {
        let (posts, _) = repositories();
        for minute in 0..25 {
            posts
                .create_post(new_post(&format!("post {minute}"), true, minute))
                .await
                .unwrap();
        }

        let page = posts.get_posts(Pagination::new(1, 10)).await.unwrap();
        let titles: Vec<_> = page.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles.len(), 10);
        assert_eq!(titles[0], "post 24");
        assert_eq!(titles[9], "post 15");

        let last = posts.get_posts(Pagination::new(3, 10)).await.unwrap();
        assert_eq!(last.len(), 5);
        assert!(posts.get_posts(Pagination::new(4, 10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_publish_time_orders_by_id_desc() {
        let (posts, _) = repositories();
        posts.create_post(new_post("older id", true, 0)).await.unwrap();
        posts.create_post(new_post("newer id", true, 0)).await.unwrap();

        let page = posts.get_posts(Pagination::new(1, 10)).await.unwrap();
        assert_eq!(page[0].title, "newer id");
    }

    #[tokio::test]
    async fn test_post_carries_its_comments() {
        let (posts, comments) = repositories();
        let post = posts.create_post(new_post("a", true, 0)).await.unwrap();
        comments.create_comment(new_comment(post.id, None)).await.unwrap();
        comments.create_comment(new_comment(post.id, None)).await.unwrap();

        let found = posts.find_post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(found.comments.len(), 2);
        assert!(posts.find_post_by_id(PostId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_post_rejects_comments() {
        let (posts, comments) = repositories();
        let post = posts.create_post(new_post("closed", false, 0)).await.unwrap();

        let result = comments.create_comment(new_comment(post.id, None)).await;
        assert_eq!(result, Err(RepositoryError::NotCommentable(post.id)));
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let (_, comments) = repositories();
        let result = comments.create_comment(new_comment(PostId(5), None)).await;
        assert_eq!(result, Err(RepositoryError::PostNotFound(PostId(5))));

        let listing = comments
            .get_comments_by_post_id(PostId(5), Pagination::new(1, 10))
            .await;
        assert_eq!(listing, Err(RepositoryError::PostNotFound(PostId(5))));
    }

    #[tokio::test]
    async fn test_parent_must_belong_to_same_post() {
        let (posts, comments) = repositories();
        let first = posts.create_post(new_post("a", true, 0)).await.unwrap();
        let second = posts.create_post(new_post("b", true, 1)).await.unwrap();
        let parent = comments.create_comment(new_comment(first.id, None)).await.unwrap();

        let reply = comments
            .create_comment(new_comment(first.id, Some(parent.id)))
            .await
            .unwrap();
        assert_eq!(reply.parent_id, Some(parent.id));

        let cross_post = comments
            .create_comment(new_comment(second.id, Some(parent.id)))
            .await;
        assert_eq!(cross_post, Err(RepositoryError::CommentNotFound(parent.id)));

        let unknown = comments
            .create_comment(new_comment(first.id, Some(CommentId(77))))
            .await;
        assert_eq!(unknown, Err(RepositoryError::CommentNotFound(CommentId(77))));
    }

    #[tokio::test]
    async fn test_comment_pages_follow_publication_order() {
        let (posts, comments) = repositories();
        let post = posts.create_post(new_post("a", true, 0)).await.unwrap();
        for _ in 0..25 {
            comments.create_comment(new_comment(post.id, None)).await.unwrap();
        }

        let first = comments
            .get_comments_by_post_id(post.id, Pagination::new(1, 10))
            .await
            .unwrap();
        let ids: Vec<i64> = first.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        let third = comments
            .get_comments_by_post_id(post.id, Pagination::new(3, 10))
            .await
            .unwrap();
        assert_eq!(third.len(), 5);

        let beyond = comments
            .get_comments_by_post_id(post.id, Pagination::new(9, 10))
            .await
            .unwrap();
        assert!(beyond.is_empty());
    }
}
