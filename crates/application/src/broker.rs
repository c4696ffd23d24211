//! 评论广播中心
//!
//! 单个后台任务独占订阅表，所有订阅、退订、发布都以命令的形式串行处理，
//! 因此订阅表不需要锁。每个订阅者拥有一个有界缓冲区，发布时使用 `try_send`
//! 扇出：缓冲区写满的订阅者丢弃这条评论，不会阻塞其他订阅者或发布者。

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use config::BrokerConfig;
use domain::{Comment, PostId};
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 订阅句柄ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 订阅表快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// 至少有一个订阅者的文章数
    pub posts: usize,
    /// 活跃订阅总数
    pub subscriptions: usize,
}

enum BrokerCommand {
    Subscribe {
        id: SubscriptionId,
        post_id: PostId,
        sender: mpsc::Sender<Comment>,
        reply: oneshot::Sender<bool>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: Option<oneshot::Sender<()>>,
    },
    Publish {
        comment: Comment,
        reply: oneshot::Sender<()>,
    },
    Stats {
        reply: oneshot::Sender<BrokerStats>,
    },
    SubscriberCount {
        post_id: PostId,
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::Sender<Comment>,
    dropped: u64,
}

/// 广播中心句柄，可以自由克隆
///
/// 所有句柄都被释放或调用 [`CommentBroker::shutdown`] 后后台任务退出，
/// 之后的订阅得到一个立即结束的流，发布直接返回。
#[derive(Clone)]
pub struct CommentBroker {
    commands: mpsc::UnboundedSender<BrokerCommand>,
    subscriber_buffer: usize,
}

impl CommentBroker {
    /// 启动后台任务，必须在 tokio 运行时中调用
    pub fn spawn(config: BrokerConfig) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = BrokerWorker {
            commands: receiver,
            max_subscriptions: config.max_subscriptions,
            posts: HashMap::new(),
            index: HashMap::new(),
        };
        tokio::spawn(worker.run());
        info!(
            subscriber_buffer = config.subscriber_buffer,
            max_subscriptions = config.max_subscriptions,
            "评论广播中心已启动"
        );

        Self {
            commands,
            subscriber_buffer: config.subscriber_buffer.max(1),
        }
    }

    /// 订阅某篇文章的新评论
    ///
    /// 返回时订阅已经登记完成，此后发布的评论都会送达。超过订阅上限或广播中心
    /// 已关闭时返回一个立即结束的流。
    pub async fn subscribe(&self, post_id: PostId) -> CommentStream {
        let id = SubscriptionId::new();
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        let (reply, accepted) = oneshot::channel();

        // 先持有流再等待登记结果，调用方中途放弃时由 Drop 负责退订
        let mut stream = CommentStream {
            id,
            post_id,
            inner: ReceiverStream::new(receiver),
            commands: Some(self.commands.downgrade()),
        };

        let registered = self
            .commands
            .send(BrokerCommand::Subscribe {
                id,
                post_id,
                sender,
                reply,
            })
            .is_ok()
            && accepted.await.unwrap_or(false);

        if !registered {
            warn!(%post_id, subscription_id = %id, "订阅被拒绝，返回已关闭的流");
            stream.commands = None;
        }

        stream
    }

    /// 退订并关闭对应的流；重复退订或未知ID不做任何事
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        let (reply, done) = oneshot::channel();
        if self
            .commands
            .send(BrokerCommand::Unsubscribe {
                id,
                reply: Some(reply),
            })
            .is_ok()
        {
            let _ = done.await;
        }
    }

    /// 将评论交给后台任务扇出，等到扇出完成后返回
    pub async fn publish(&self, comment: Comment) {
        let (reply, done) = oneshot::channel();
        if self
            .commands
            .send(BrokerCommand::Publish { comment, reply })
            .is_ok()
        {
            let _ = done.await;
        } else {
            debug!("广播中心已关闭，忽略发布");
        }
    }

    pub async fn stats(&self) -> BrokerStats {
        let (reply, stats) = oneshot::channel();
        if self.commands.send(BrokerCommand::Stats { reply }).is_err() {
            return BrokerStats::default();
        }
        stats.await.unwrap_or_default()
    }

    pub async fn subscriber_count(&self, post_id: PostId) -> usize {
        let (reply, count) = oneshot::channel();
        if self
            .commands
            .send(BrokerCommand::SubscriberCount { post_id, reply })
            .is_err()
        {
            return 0;
        }
        count.await.unwrap_or(0)
    }

    /// 关闭所有订阅流并停止后台任务
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(BrokerCommand::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
    }
}

/// 某篇文章的评论流
///
/// 流被释放时自动退订，不需要等待。
pub struct CommentStream {
    id: SubscriptionId,
    post_id: PostId,
    inner: ReceiverStream<Comment>,
    commands: Option<mpsc::WeakUnboundedSender<BrokerCommand>>,
}

impl CommentStream {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }
}

impl fmt::Debug for CommentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentStream")
            .field("id", &self.id)
            .field("post_id", &self.post_id)
            .finish()
    }
}

impl Stream for CommentStream {
    type Item = Comment;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for CommentStream {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take().and_then(|weak| weak.upgrade()) {
            let _ = commands.send(BrokerCommand::Unsubscribe {
                id: self.id,
                reply: None,
            });
        }
    }
}

struct BrokerWorker {
    commands: mpsc::UnboundedReceiver<BrokerCommand>,
    max_subscriptions: usize,
    posts: HashMap<PostId, Vec<Subscriber>>,
    index: HashMap<SubscriptionId, PostId>,
}

impl BrokerWorker {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                BrokerCommand::Subscribe {
                    id,
                    post_id,
                    sender,
                    reply,
                } => {
                    let accepted = self.subscribe(id, post_id, sender);
                    let _ = reply.send(accepted);
                }
                BrokerCommand::Unsubscribe { id, reply } => {
                    self.remove(id);
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                }
                BrokerCommand::Publish { comment, reply } => {
                    self.publish(comment);
                    let _ = reply.send(());
                }
                BrokerCommand::Stats { reply } => {
                    let _ = reply.send(BrokerStats {
                        posts: self.posts.len(),
                        subscriptions: self.index.len(),
                    });
                }
                BrokerCommand::SubscriberCount { post_id, reply } => {
                    let count = self.posts.get(&post_id).map_or(0, Vec::len);
                    let _ = reply.send(count);
                }
                BrokerCommand::Shutdown { reply } => {
                    self.close_all();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.close_all();
        info!("评论广播中心已停止");
    }

    fn subscribe(
        &mut self,
        id: SubscriptionId,
        post_id: PostId,
        sender: mpsc::Sender<Comment>,
    ) -> bool {
        if self.index.len() >= self.max_subscriptions {
            warn!(
                %post_id,
                max_subscriptions = self.max_subscriptions,
                "订阅数已达上限"
            );
            return false;
        }

        self.posts.entry(post_id).or_default().push(Subscriber {
            id,
            sender,
            dropped: 0,
        });
        self.index.insert(id, post_id);
        debug!(%post_id, subscription_id = %id, "新增评论订阅");
        true
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(post_id) = self.index.remove(&id) else {
            return false;
        };

        if let Some(subscribers) = self.posts.get_mut(&post_id) {
            if let Some(position) = subscribers.iter().position(|s| s.id == id) {
                let subscriber = subscribers.remove(position);
                if subscriber.dropped > 0 {
                    info!(
                        %post_id,
                        subscription_id = %id,
                        dropped = subscriber.dropped,
                        "订阅结束，期间有评论因缓冲区已满被丢弃"
                    );
                }
            }
            if subscribers.is_empty() {
                self.posts.remove(&post_id);
            }
        }
        debug!(%post_id, subscription_id = %id, "移除评论订阅");
        true
    }

    fn publish(&mut self, comment: Comment) {
        let post_id = comment.post_id;
        let Some(subscribers) = self.posts.get_mut(&post_id) else {
            return;
        };

        let mut closed = Vec::new();
        for subscriber in subscribers.iter_mut() {
            match subscriber.sender.try_send(comment.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    subscriber.dropped += 1;
                    warn!(
                        %post_id,
                        subscription_id = %subscriber.id,
                        comment_id = %comment.id,
                        dropped = subscriber.dropped,
                        "订阅者缓冲区已满，丢弃评论"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(subscriber.id),
            }
        }

        for id in closed {
            self.remove(id);
        }
    }

    fn close_all(&mut self) {
        if !self.index.is_empty() {
            info!(subscriptions = self.index.len(), "关闭全部评论订阅");
        }
        self.posts.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use domain::{AuthorId, CommentId};
    use futures::{FutureExt, StreamExt};

    use super::*;

    fn comment(id: i64, post_id: i64, content: &str) -> Comment {
        Comment {
            id: CommentId(id),
            post_id: PostId(post_id),
            content: content.to_string(),
            author_id: AuthorId(1),
            parent_id: None,
            published_at: Utc::now(),
        }
    }

    fn broker(subscriber_buffer: usize, max_subscriptions: usize) -> CommentBroker {
        CommentBroker::spawn(BrokerConfig {
            subscriber_buffer,
            max_subscriptions,
        })
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_comment() {
        let broker = broker(8, 100);
        let mut stream = broker.subscribe(PostId(42)).await;

        broker.publish(comment(1, 42, "hi")).await;
        let received = stream.next().await.expect("comment delivered");
        assert_eq!(received.content, "hi");
        assert_eq!(received.post_id, PostId(42));

        broker.unsubscribe(stream.id()).await;
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribed_stream_gets_nothing_else() {
        let broker = broker(8, 100);
        let mut first = broker.subscribe(PostId(7)).await;
        let mut second = broker.subscribe(PostId(7)).await;

        broker.unsubscribe(first.id()).await;
        broker.publish(comment(1, 7, "only for second")).await;

        assert!(first.next().await.is_none());
        assert_eq!(second.next().await.map(|c| c.id), Some(CommentId(1)));
        assert_eq!(broker.subscriber_count(PostId(7)).await, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let broker = broker(8, 100);
        let stream = broker.subscribe(PostId(1)).await;
        let _other = broker.subscribe(PostId(1)).await;

        broker.unsubscribe(stream.id()).await;
        broker.unsubscribe(stream.id()).await;
        broker.unsubscribe(SubscriptionId::new()).await;

        assert_eq!(
            broker.stats().await,
            BrokerStats {
                posts: 1,
                subscriptions: 1
            }
        );
    }

    #[tokio::test]
    async fn test_last_unsubscribe_removes_post_entry() {
        let broker = broker(8, 100);
        let stream = broker.subscribe(PostId(5)).await;
        assert_eq!(broker.stats().await.posts, 1);

        broker.unsubscribe(stream.id()).await;
        assert_eq!(broker.stats().await, BrokerStats::default());
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let broker = broker(8, 100);
        let stream = broker.subscribe(PostId(5)).await;
        drop(stream);

        assert_eq!(broker.subscriber_count(PostId(5)).await, 0);
        assert_eq!(broker.stats().await, BrokerStats::default());
    }

    #[tokio::test]
    async fn test_cancelled_subscribe_leaves_no_registration() {
        let broker = broker(8, 1);

        // 第一次轮询只发出登记命令，后台任务尚未回复
        assert!(broker.subscribe(PostId(1)).now_or_never().is_none());
        assert_eq!(broker.stats().await, BrokerStats::default());

        let mut stream = broker.subscribe(PostId(1)).await;
        assert_eq!(broker.subscriber_count(PostId(1)).await, 1);
        broker.publish(comment(1, 1, "after cancel")).await;
        assert_eq!(stream.next().await.map(|c| c.id), Some(CommentId(1)));
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_comments() {
        let broker = broker(8, 100);
        broker.publish(comment(1, 3, "before")).await;

        let mut stream = broker.subscribe(PostId(3)).await;
        broker.publish(comment(2, 3, "after")).await;

        assert_eq!(stream.next().await.map(|c| c.id), Some(CommentId(2)));
        assert!(stream.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_comments_arrive_in_publish_order() {
        let broker = broker(32, 100);
        let mut stream = broker.subscribe(PostId(9)).await;

        for id in 1..=20 {
            broker.publish(comment(id, 9, "ordered")).await;
        }

        let received: Vec<i64> = stream.by_ref().take(20).map(|c| c.id.0).collect().await;
        assert_eq!(received, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_comments_stay_within_their_post() {
        let broker = broker(8, 100);
        let mut first = broker.subscribe(PostId(1)).await;
        let mut second = broker.subscribe(PostId(2)).await;

        broker.publish(comment(10, 2, "for post 2")).await;

        assert!(first.next().now_or_never().is_none());
        assert_eq!(second.next().await.map(|c| c.id), Some(CommentId(10)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let broker = broker(4, 100);
        let mut idle = broker.subscribe(PostId(1)).await;
        let mut active = broker.subscribe(PostId(1)).await;

        for id in 1..=10 {
            tokio::time::timeout(Duration::from_secs(1), broker.publish(comment(id, 1, "x")))
                .await
                .expect("publish must not wait for slow subscribers");
            assert_eq!(active.next().await.map(|c| c.id.0), Some(id));
        }

        let kept: Vec<i64> = idle.by_ref().take(4).map(|c| c.id.0).collect().await;
        assert_eq!(kept, vec![1, 2, 3, 4]);
        assert!(idle.next().now_or_never().is_none());
        assert_eq!(broker.subscriber_count(PostId(1)).await, 2);
    }

    #[tokio::test]
    async fn test_subscription_limit_returns_closed_stream() {
        let broker = broker(8, 1);
        let _accepted = broker.subscribe(PostId(1)).await;
        let mut rejected = broker.subscribe(PostId(1)).await;

        assert!(rejected.next().await.is_none());
        assert_eq!(broker.stats().await.subscriptions, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_every_stream() {
        let broker = broker(8, 100);
        let mut first = broker.subscribe(PostId(1)).await;
        let mut second = broker.subscribe(PostId(2)).await;

        broker.shutdown().await;

        assert!(first.next().await.is_none());
        assert!(second.next().await.is_none());

        let mut late = broker.subscribe(PostId(1)).await;
        assert!(late.next().await.is_none());
        broker.publish(comment(1, 1, "ignored")).await;
        assert_eq!(broker.stats().await, BrokerStats::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishers_keep_per_publisher_order() {
        let broker = broker(512, 100);
        let mut stream = broker.subscribe(PostId(1)).await;

        let mut handles = Vec::new();
        for publisher in 0..8i64 {
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                for seq in 0..25i64 {
                    broker
                        .publish(comment(publisher * 1_000 + seq, 1, "concurrent"))
                        .await;
                }
            }));
        }
        for handle in handles {
            handle.await.expect("publisher task");
        }

        let received: Vec<i64> = stream.by_ref().take(200).map(|c| c.id.0).collect().await;
        assert_eq!(received.len(), 200);
        for publisher in 0..8i64 {
            let sequence: Vec<i64> = received
                .iter()
                .copied()
                .filter(|id| id / 1_000 == publisher)
                .collect();
            let expected: Vec<i64> = (0..25).map(|seq| publisher * 1_000 + seq).collect();
            assert_eq!(sequence, expected);
        }
    }
}
