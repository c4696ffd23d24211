//! 领域实体定义
//!
//! 包含系统的核心实体：文章与评论。

pub mod comment;
pub mod post;

pub use comment::{Comment, NewComment};
pub use post::{NewPost, Post};
