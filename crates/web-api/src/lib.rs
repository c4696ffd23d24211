//! Web API 层。
//!
//! 提供 GraphQL 接口（查询、变更、评论订阅）与 Axum 路由，
//! 将请求委托给应用层的用例服务。

mod error;
mod routes;
mod schema;
mod state;

pub use error::ApiError;
pub use routes::router;
pub use schema::{build_schema, AppSchema, CommentObject, PostObject};
pub use state::AppState;
