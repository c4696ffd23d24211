use application::ApplicationError;
use async_graphql::ErrorExtensions;
use domain::DomainError;
use tracing::error;

/// 对外暴露的错误，`code` 写入 GraphQL 错误的 `extensions.code`
#[derive(Debug, PartialEq, Eq)]
pub struct ApiError {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new("PERSISTENCE_ERROR", message)
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_graphql(self) -> async_graphql::Error {
        let code = self.code;
        async_graphql::Error::new(self.message).extend_with(|_, e| e.set("code", code))
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Validation(message) => ApiError::validation(message),
            ApplicationError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            ApplicationError::Domain(DomainError::CommentsDisabled(post_id)) => ApiError::new(
                "COMMENTS_DISABLED",
                format!("comments are disabled for post {post_id}"),
            ),
            ApplicationError::Domain(DomainError::ValidationError { field, message }) => {
                ApiError::validation(format!("{field}: {message}"))
            }
            ApplicationError::Persistence(message) => {
                error!(error = %message, "存储层错误");
                ApiError::persistence("storage failure")
            }
        }
    }
}

/// 解析器中使用：`service.call().await.map_err(graphql_error)?`
pub(crate) fn graphql_error(error: ApplicationError) -> async_graphql::Error {
    ApiError::from(error).into_graphql()
}
