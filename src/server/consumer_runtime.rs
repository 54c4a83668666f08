use crate::application_impl::RealTodoService;
use crate::application_port::TodoService;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use sqlx::MySqlPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The welcome-todo worker: one [`MessageConsumer`] running on its own task.
pub struct ConsumerRuntime {
    handle: JoinHandle<Result<(), ConsumerError>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl ConsumerRuntime {
    /// Start `consumer` on a new task.
    pub fn spawn(consumer: MessageConsumer, pool: Option<MySqlPool>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { consumer.consume(token).await });
        Self {
            handle,
            cancel,
            pool,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let pool = connect_pool(&settings.mysql.url, settings.mysql.max_connections).await?;
        let todo_service: Arc<dyn TodoService> =
            Arc::new(RealTodoService::new(Arc::new(MySqlTodoRepo::new(pool.clone()))));

        let source = KafkaMessageSource::new(&KafkaSourceConfig {
            bootstrap_servers: settings.kafka.bootstrap_servers.clone(),
            group_id: settings.kafka.group_id.clone(),
            client_id: format!("todo-sub-{}", run_id()),
            auto_offset_reset: settings.kafka.auto_offset_reset.clone(),
        })?;

        let consumer = MessageConsumer::new(
            Arc::new(source),
            Arc::new(WelcomeTodoHandler::new(todo_service)),
            ConsumerConfig {
                topic: settings.kafka.user_registered_topic.clone(),
                max_retries: settings.consumer.max_retries,
                backoff: Duration::from_millis(settings.consumer.backoff_ms),
                max_execute: Duration::from_millis(settings.consumer.max_execute_ms),
            },
        );
        info!(config = ?consumer.config(), "consumer starting");

        Ok(Self::spawn(consumer, Some(pool)))
    }

    /// Run until `shutdown` resolves or the consumer stops by itself, then
    /// release resources. A consumer stopped by cancellation is a clean exit.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let ConsumerRuntime {
            mut handle,
            cancel,
            pool,
        } = self;

        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = shutdown => {
                info!("consumer shutting down...");
                cancel.cancel();
                (&mut handle).await
            }
        };

        if let Some(pool) = pool {
            pool.close().await;
        }

        match joined {
            Ok(Ok(())) | Ok(Err(ConsumerError::Cancelled)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(anyhow::anyhow!("consumer task failed: {e}")),
        }
    }
}
