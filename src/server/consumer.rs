use crate::logger::*;
use crate::server::{EventHandler, HandlerContext, HandlerError, MessageSource, QueuedMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_EXECUTE: Duration = Duration::from_secs(60);

const POLL_TIMEOUT: Duration = Duration::from_secs(1);
const POLL_ERROR_PAUSE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConsumerConfig {
    pub topic: String,
    pub max_retries: u32,
    /// Base delay; the wait after attempt `n` (0-based) is `backoff * 2^n`.
    pub backoff: Duration,
    /// Upper bound for a single handler attempt.
    pub max_execute: Duration,
}

impl ConsumerConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        ConsumerConfig {
            topic: topic.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
            max_execute: DEFAULT_MAX_EXECUTE,
        }
    }

    /// Zero values mean "unset" and take the defaults.
    fn normalized(mut self) -> Self {
        if self.max_retries == 0 {
            self.max_retries = DEFAULT_MAX_RETRIES;
        }
        if self.backoff.is_zero() {
            self.backoff = DEFAULT_BACKOFF;
        }
        if self.max_execute.is_zero() {
            self.max_execute = DEFAULT_MAX_EXECUTE;
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("failed to subscribe to {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("consumer cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("execution cancelled")]
    Cancelled,
    #[error("handler failed after {attempts} attempts, last error: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("handler failed permanently: {0}")]
    NonRetryable(#[source] HandlerError),
}

impl ExecuteError {
    fn attempts(&self) -> u32 {
        match self {
            ExecuteError::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

/// Why one attempt did not succeed.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Handler(HandlerError),
    #[error("handler panic: {0}")]
    Panic(String),
    #[error("handler execution timeout")]
    Timeout,
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Pulls messages from a [`MessageSource`] and drives each through an
/// [`EventHandler`] with bounded retries, exponential backoff, a per-attempt
/// timeout and panic isolation. Offsets are committed only after a message is
/// finished with, whatever the outcome.
pub struct MessageConsumer {
    source: Arc<dyn MessageSource>,
    handler: Arc<dyn EventHandler>,
    config: ConsumerConfig,
}

impl MessageConsumer {
    pub fn new(
        source: Arc<dyn MessageSource>,
        handler: Arc<dyn EventHandler>,
        config: ConsumerConfig,
    ) -> Self {
        MessageConsumer {
            source,
            handler,
            config: config.normalized(),
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Run until `cancel` fires or subscribing fails. The source is closed on
    /// every exit path.
    pub async fn consume(&self, cancel: CancellationToken) -> Result<(), ConsumerError> {
        let topic = self.config.topic.clone();

        let subscribed = self.source.subscribe(&topic).await;
        let result = match subscribed {
            Ok(()) => {
                info!(topic = %topic, "consumer subscribed");
                self.poll_loop(&cancel).await
            }
            Err(source) => Err(ConsumerError::Subscribe { topic, source }),
        };

        self.source.close().await;
        info!(topic = %self.config.topic, "consumer closed");
        result
    }

    async fn poll_loop(&self, cancel: &CancellationToken) -> Result<(), ConsumerError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ConsumerError::Cancelled);
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConsumerError::Cancelled),
                polled = self.source.poll(POLL_TIMEOUT) => polled,
            };

            let message = match polled {
                Ok(Some(message)) => Arc::new(message),
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "consumer poll error");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ConsumerError::Cancelled),
                        _ = tokio::time::sleep(POLL_ERROR_PAUSE) => {}
                    }
                    continue;
                }
            };

            match self.execute_with_retry(cancel, message.clone()).await {
                Ok(()) => {}
                Err(ExecuteError::Cancelled) => {
                    info!(
                        coordinates = %message.coordinates(),
                        "cancelled mid-retry, leaving message uncommitted"
                    );
                    return Err(ConsumerError::Cancelled);
                }
                Err(e) => {
                    error!(
                        topic = %message.topic,
                        key = %message.key_str(),
                        attempts = e.attempts(),
                        error = %e,
                        "failed to execute message"
                    );
                }
            }

            if let Err(e) = self.source.commit(&message).await {
                error!(
                    coordinates = %message.coordinates(),
                    error = %e,
                    "failed to commit message"
                );
            }
        }
    }

    /// Run the handler on `message` up to `max_retries` times.
    ///
    /// Cancellation is observed between attempts only; an attempt already in
    /// flight sees its context cancelled but is still awaited.
    pub async fn execute_with_retry(
        &self,
        cancel: &CancellationToken,
        message: Arc<QueuedMessage>,
    ) -> Result<(), ExecuteError> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..max_retries {
            match self.run_attempt(cancel, &message).await {
                Ok(()) => return Ok(()),
                Err(AttemptError::Handler(e)) if !e.is_retryable() => {
                    return Err(ExecuteError::NonRetryable(e));
                }
                Err(e) => {
                    warn!(
                        coordinates = %message.coordinates(),
                        attempt = attempt + 1,
                        max_retries,
                        error = %e,
                        "handler attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt + 1 < max_retries {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ExecuteError::Cancelled),
                    _ = tokio::time::sleep(self.backoff_for(attempt)) => {}
                }
            }
        }

        let source = match last_error {
            Some(e) => anyhow::Error::from(e),
            None => anyhow::anyhow!("no attempt was made"),
        };
        Err(ExecuteError::Exhausted {
            attempts: max_retries,
            source,
        })
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.config.backoff.saturating_mul(factor)
    }

    async fn run_attempt(
        &self,
        cancel: &CancellationToken,
        message: &Arc<QueuedMessage>,
    ) -> Result<(), AttemptError> {
        let child = cancel.child_token();
        let ctx = HandlerContext {
            cancel: child.clone(),
        };
        let handler = self.handler.clone();
        let message = message.clone();

        let task = tokio::spawn(async move { handler.handle(ctx, &message).await });

        match tokio::time::timeout(self.config.max_execute, task).await {
            Ok(Ok(result)) => result.map_err(AttemptError::Handler),
            Ok(Err(join_err)) => Err(AttemptError::Panic(describe_join_error(join_err))),
            Err(_) => {
                // The task is detached; whatever it returns later is dropped.
                child.cancel();
                Err(AttemptError::Timeout)
            }
        }
    }
}
