//! 基础设施层实现。
//!
//! 提供内存与 PostgreSQL 两种存储，实现领域层定义的仓储接口。

pub mod builder;
pub mod memory;
pub mod migrations;
pub mod repository;
pub mod retry;

pub use builder::{InfrastructureError, Storage};
pub use memory::{MemoryCommentRepository, MemoryPostRepository, MemoryStore};
pub use migrations::MIGRATOR;
pub use repository::{create_pg_pool, PgCommentRepository, PgPostRepository, PgStorage};
