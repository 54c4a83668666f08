use crate::logger::*;
use crate::server::{MessageSource, QueuedMessage};
use anyhow::anyhow;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub client_id: String,
    pub auto_offset_reset: String,
}

/// [`MessageSource`] over an rdkafka `StreamConsumer` with manual commits.
pub struct KafkaMessageSource {
    consumer: StreamConsumer,
    bootstrap_servers: String,
}

impl KafkaMessageSource {
    pub fn new(cfg: &KafkaSourceConfig) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &cfg.bootstrap_servers)
            .set("client.id", &cfg.client_id)
            .set("group.id", &cfg.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &cfg.auto_offset_reset)
            .create()?;

        Ok(Self {
            consumer,
            bootstrap_servers: cfg.bootstrap_servers.clone(),
        })
    }

    async fn ensure_topics(bootstrap: &str, topics: &[&str]) -> anyhow::Result<()> {
        let admin: AdminClient<_> = ClientConfig::new()
            .set("bootstrap.servers", bootstrap)
            .create()?;

        let new_topics: Vec<_> = topics
            .iter()
            .map(|t| NewTopic::new(t, 1, TopicReplication::Fixed(1)))
            .collect();

        // per-topic failures (already exists) are fine
        let _ = admin
            .create_topics(&new_topics, &AdminOptions::new())
            .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageSource for KafkaMessageSource {
    async fn subscribe(&self, topic: &str) -> anyhow::Result<()> {
        if let Err(e) = Self::ensure_topics(&self.bootstrap_servers, &[topic]).await {
            warn!(topic, error = %e, "could not ensure topic exists");
        }
        self.consumer
            .subscribe(&[topic])
            .map_err(|e| anyhow!("subscribe {topic}: {e}"))
    }

    async fn poll(&self, timeout: Duration) -> anyhow::Result<Option<QueuedMessage>> {
        let received = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_elapsed) => return Ok(None),
            Ok(received) => received?,
        };

        Ok(Some(QueuedMessage {
            topic: received.topic().to_string(),
            partition: received.partition(),
            offset: received.offset(),
            key: received.key().unwrap_or(&[]).to_vec(),
            payload: received.payload().unwrap_or(&[]).to_vec(),
        }))
    }

    async fn commit(&self, message: &QueuedMessage) -> anyhow::Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }

    async fn close(&self) {
        self.consumer.unsubscribe();
    }
}
