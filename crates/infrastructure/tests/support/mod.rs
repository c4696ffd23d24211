//! 两种存储共用的仓储契约

use chrono::{Duration, TimeZone, Utc};
use domain::{
    AuthorId, CommentId, NewComment, NewPost, Pagination, PostId, RepositoryError,
};
use infrastructure::Storage;

fn new_post(title: &str, commentable: bool, minutes: i64) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: format!("content of {title}"),
        author_id: AuthorId(10),
        commentable,
        published_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
            + Duration::minutes(minutes),
    }
}

fn new_comment(post_id: PostId, content: &str, parent_id: Option<CommentId>) -> NewComment {
    NewComment {
        post_id,
        content: content.to_string(),
        author_id: AuthorId(20),
        parent_id,
        published_at: Utc::now(),
    }
}

pub async fn repository_contract(storage: &Storage) {
    let posts = storage.post_repository();
    let comments = storage.comment_repository();

    let open = posts
        .create_post(new_post("open", true, 0))
        .await
        .expect("create open post");
    let closed = posts
        .create_post(new_post("closed", false, 5))
        .await
        .expect("create closed post");
    assert!(open.comments.is_empty());
    assert_ne!(open.id, closed.id);

    // 文章按发布时间倒序
    let listed = posts.get_posts(Pagination::new(1, 10)).await.expect("list");
    let titles: Vec<_> = listed.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["closed", "open"]);
    assert!(posts
        .get_posts(Pagination::new(2, 10))
        .await
        .expect("second page")
        .is_empty());

    let first = comments
        .create_comment(new_comment(open.id, "first", None))
        .await
        .expect("first comment");
    let reply = comments
        .create_comment(new_comment(open.id, "reply", Some(first.id)))
        .await
        .expect("reply");
    assert_eq!(reply.parent_id, Some(first.id));
    assert!(reply.id.0 > first.id.0);

    assert_eq!(
        comments
            .create_comment(new_comment(closed.id, "nope", None))
            .await,
        Err(RepositoryError::NotCommentable(closed.id))
    );
    assert_eq!(
        comments
            .create_comment(new_comment(PostId(9_999), "nope", None))
            .await,
        Err(RepositoryError::PostNotFound(PostId(9_999)))
    );
    assert_eq!(
        comments
            .create_comment(new_comment(open.id, "orphan", Some(CommentId(9_999))))
            .await,
        Err(RepositoryError::CommentNotFound(CommentId(9_999)))
    );

    let page = comments
        .get_comments_by_post_id(open.id, Pagination::new(1, 1))
        .await
        .expect("comment page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].content, "first");
    let page = comments
        .get_comments_by_post_id(open.id, Pagination::new(2, 1))
        .await
        .expect("comment page 2");
    assert_eq!(page[0].content, "reply");

    let found = posts
        .find_post_by_id(open.id)
        .await
        .expect("find")
        .expect("post exists");
    let contents: Vec<_> = found.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "reply"]);
    assert!(posts
        .find_post_by_id(PostId(9_999))
        .await
        .expect("find missing")
        .is_none());
}
