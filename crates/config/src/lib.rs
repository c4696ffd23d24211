//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听与日志级别
//! - 存储后端选择与数据库连接
//! - 评论广播中心
//! - 文章与评论的校验、分页参数
//!
//! 加载顺序：默认值 -> 可选配置文件（`APP_CONFIG_FILE`）-> 环境变量（`APP_` 前缀，`__` 分隔层级）。

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// 运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// 存储后端，启动时选定一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// 是否在 `/` 提供 GraphiQL 调试页面
    #[serde(default)]
    pub playground: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LogConfig {
    #[validate(length(min = 1))]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[validate(range(min = 1))]
    pub max_connections: u32,
    /// 建立连接池的最大尝试次数
    #[validate(range(min = 1))]
    pub connect_attempts: u32,
    /// 两次尝试之间的等待秒数
    pub connect_timeout_seconds: u64,
}

/// 评论广播中心配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct BrokerConfig {
    /// 每个订阅者的缓冲区容量，写满后丢弃新评论
    #[validate(range(min = 1))]
    pub subscriber_buffer: usize,
    /// 全局活跃订阅上限
    #[validate(range(min = 1))]
    pub max_subscriptions: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
            max_subscriptions: 10_000,
        }
    }
}

/// 评论服务配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentConfig {
    #[validate(range(min = 1))]
    pub max_characters: usize,
    #[validate(range(min = 1))]
    pub default_page: u32,
    #[validate(range(min = 1))]
    pub default_amount: u32,
    #[validate(range(min = 1))]
    pub max_amount: u32,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            max_characters: 2_000,
            default_page: 1,
            default_amount: 10,
            max_amount: 100,
        }
    }
}

/// 文章服务配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostConfig {
    #[validate(range(min = 1))]
    pub title_max_characters: usize,
    #[validate(range(min = 1))]
    pub content_max_characters: usize,
    #[validate(range(min = 1))]
    pub default_page: u32,
    #[validate(range(min = 1))]
    pub default_amount: u32,
    #[validate(range(min = 1))]
    pub max_amount: u32,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            title_max_characters: 200,
            content_max_characters: 20_000,
            default_page: 1,
            default_amount: 10,
            max_amount: 100,
        }
    }
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_cross_fields"))]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub log: LogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub broker: BrokerConfig,
    #[validate(nested)]
    pub comment: CommentConfig,
    #[validate(nested)]
    pub post: PostConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
                playground: true,
            },
            log: LogConfig {
                level: "info".into(),
            },
            storage: StorageConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
                connect_attempts: 10,
                connect_timeout_seconds: 1,
            },
            broker: BrokerConfig::default(),
            comment: CommentConfig::default(),
            post: PostConfig::default(),
        }
    }
}

fn validate_cross_fields(config: &AppConfig) -> Result<(), ValidationError> {
    if config.storage.backend == StorageBackend::Postgres && config.database.url.trim().is_empty()
    {
        return Err(ValidationError::new("postgres_requires_database_url"));
    }
    if config.comment.default_amount > config.comment.max_amount
        || config.post.default_amount > config.post.max_amount
    {
        return Err(ValidationError::new("default_amount_exceeds_max_amount"));
    }
    Ok(())
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> 环境变量 的顺序合并配置
    pub fn figment() -> Figment {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig.merge(Env::prefixed("APP_").split("__"))
    }

    /// 加载并验证配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// 用于日志输出的脱敏描述
    pub fn sanitize(&self) -> String {
        let mut text = format!("{:?}", self);
        if let Some(start) = text.find("postgres://") {
            let end = text[start..]
                .find('"')
                .map(|i| start + i)
                .unwrap_or(text.len());
            text.replace_range(start..end, "postgres://[REDACTED]");
        }
        text
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
