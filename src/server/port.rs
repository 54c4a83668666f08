use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A message read from the broker, owned by the engine until committed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct QueuedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
}

impl QueuedMessage {
    /// `topic[partition]@offset`, for logs and error context.
    pub fn coordinates(&self) -> String {
        format!("{}[{}]@{}", self.topic, self.partition, self.offset)
    }

    pub fn key_str(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

/// Broker side of the consumption engine.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    async fn subscribe(&self, topic: &str) -> anyhow::Result<()>;

    /// Wait up to `timeout` for the next message. `Ok(None)` means nothing
    /// arrived in time.
    async fn poll(&self, timeout: Duration) -> anyhow::Result<Option<QueuedMessage>>;

    /// Mark `message` processed so it is not delivered again to the group.
    async fn commit(&self, message: &QueuedMessage) -> anyhow::Result<()>;

    async fn close(&self);
}

/// Per-attempt context handed to a handler.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Cancelled when the attempt times out or the engine shuts down.
    pub cancel: CancellationToken,
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("failed to decode message at {coordinates}: {source}")]
    Decode {
        coordinates: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    /// Decode failures can never succeed on redelivery of the same bytes.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, HandlerError::Decode { .. })
    }
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: HandlerContext, message: &QueuedMessage)
    -> Result<(), HandlerError>;
}
