//! 领域模型错误定义
//!
//! 定义了领域层与仓储层可能出现的错误类型，提供清晰的错误上下文。

use thiserror::Error;

use crate::value_objects::{CommentId, PostId};

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 验证错误
    #[error("验证失败: {field}: {message}")]
    ValidationError { field: String, message: String },

    /// 文章已关闭评论
    #[error("文章 {0} 不允许评论")]
    CommentsDisabled(PostId),
}

impl DomainError {
    /// 创建验证错误
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 仓储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("comment {0} not found")]
    CommentNotFound(CommentId),

    #[error("post {0} is not commentable")]
    NotCommentable(PostId),

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
