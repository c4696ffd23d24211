//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、分页解析，
//! 以及评论的实时推送（评论广播中心）。

pub mod broker;
pub mod clock;
pub mod error;
pub mod services;

pub use broker::{BrokerStats, CommentBroker, CommentStream, SubscriptionId};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ApplicationError;
pub use services::{
    CommentService, CommentServiceDependencies, CreateCommentRequest, CreatePostRequest,
    PostService, PostServiceDependencies,
};
