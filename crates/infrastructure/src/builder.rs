use std::sync::Arc;
use std::time::Duration;

use config::{AppConfig, StorageBackend};
use domain::{CommentRepository, PostRepository};
use thiserror::Error;
use tracing::info;

use crate::{
    memory::{MemoryCommentRepository, MemoryPostRepository, MemoryStore},
    migrations::MIGRATOR,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 启动时选定的存储后端
pub enum Storage {
    Memory(Arc<MemoryStore>),
    Postgres(PgStorage),
}

impl Storage {
    /// 按配置建立存储；PostgreSQL 会先建立连接池再执行迁移
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("使用内存存储");
                Ok(Self::memory())
            }
            StorageBackend::Postgres => {
                let database = &config.database;
                let pool = create_pg_pool(
                    &database.url,
                    database.max_connections,
                    database.connect_attempts,
                    Duration::from_secs(database.connect_timeout_seconds),
                )
                .await?;
                MIGRATOR.run(&pool).await?;
                info!("使用 PostgreSQL 存储，迁移已完成");
                Ok(Self::Postgres(PgStorage::new(pool)))
            }
        }
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn post_repository(&self) -> Arc<dyn PostRepository> {
        match self {
            Self::Memory(store) => Arc::new(MemoryPostRepository::new(store.clone())),
            Self::Postgres(storage) => storage.post_repository.clone(),
        }
    }

    pub fn comment_repository(&self) -> Arc<dyn CommentRepository> {
        match self {
            Self::Memory(store) => Arc::new(MemoryCommentRepository::new(store.clone())),
            Self::Postgres(storage) => storage.comment_repository.clone(),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::Memory(_) => StorageBackend::Memory,
            Self::Postgres(_) => StorageBackend::Postgres,
        }
    }

    /// 关闭连接池，内存存储无需处理
    pub async fn close(&self) {
        if let Self::Postgres(storage) = self {
            storage.pool.close().await;
        }
    }
}
