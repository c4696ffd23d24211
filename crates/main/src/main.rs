//! 主应用程序入口
//!
//! 加载配置、选择存储后端，启动 GraphQL Web 服务。

use std::sync::Arc;

use application::{
    CommentService, CommentServiceDependencies, PostService, PostServiceDependencies, SystemClock,
};
use config::AppConfig;
use infrastructure::Storage;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG 优先，未设置时使用配置中的日志级别
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))?;
    // 开发环境输出彩色日志，生产环境输出纯文本便于采集
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.is_development())
        .init();

    info!(config = %config.sanitize(), "配置已加载");

    let storage = Storage::connect(&config).await?;
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    let post_service = Arc::new(PostService::new(PostServiceDependencies {
        post_repository: storage.post_repository(),
        clock: clock.clone(),
        config: config.post.clone(),
    }));
    let comment_service = Arc::new(CommentService::new(CommentServiceDependencies {
        comment_repository: storage.comment_repository(),
        clock,
        config: config.comment.clone(),
        broker: config.broker,
    }));

    let state = AppState::new(
        post_service,
        comment_service.clone(),
        config.server.playground,
    );
    let app = router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        backend = ?storage.backend(),
        "博客服务启动在 http://{address}/query"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    comment_service.shutdown().await;
    storage.close().await;
    info!("服务已停止");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "无法监听 Ctrl+C 信号");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig_term) => {
                sig_term.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "无法监听终止信号");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("接收到 Ctrl+C 信号，开始优雅停机..."),
        _ = terminate => info!("接收到终止信号，开始优雅停机..."),
    }
}
