mod comment_service;
mod post_service;


pub use comment_service::{CommentService, CommentServiceDependencies, CreateCommentRequest};
pub use post_service::{CreatePostRequest, PostService, PostServiceDependencies};
