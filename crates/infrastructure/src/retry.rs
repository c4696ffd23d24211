use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// 每次失败后等待的固定时长
    pub delay: Duration,
}

/// 重复执行 `op` 直到成功或用完尝试次数，返回最后一次的错误
pub async fn retry_async<F, Fut, T, E>(config: RetryConfig, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= max_attempts {
                    return Err(e);
                }
                let delay = config.delay;
                warn!(attempt, max_attempts, error = %e, ?delay, "操作失败，稍后重试");
                sleep(delay).await;
            }
        }
    }
}
