use std::sync::Arc;

use application::{
    CommentService, CommentServiceDependencies, PostService, PostServiceDependencies,
    SystemClock,
};
use config::{BrokerConfig, CommentConfig, PostConfig};
use infrastructure::Storage;
use web_api::AppState;

/// 基于内存存储的完整应用状态
pub fn memory_app_state(playground: bool) -> AppState {
    let storage = Storage::memory();
    let post_service = Arc::new(PostService::new(PostServiceDependencies {
        post_repository: storage.post_repository(),
        clock: Arc::new(SystemClock),
        config: PostConfig::default(),
    }));
    let comment_service = Arc::new(CommentService::new(CommentServiceDependencies {
        comment_repository: storage.comment_repository(),
        clock: Arc::new(SystemClock),
        config: CommentConfig {
            max_characters: 50,
            ..CommentConfig::default()
        },
        broker: BrokerConfig::default(),
    }));

    AppState::new(post_service, comment_service, playground)
}
