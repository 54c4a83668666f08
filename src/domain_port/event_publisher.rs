use crate::domain_model::DomainEvent;

#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()>;
}

/// Serialize `event` as JSON and publish it on `topic` under the event key.
pub async fn publish_event(
    publisher: &dyn EventPublisher,
    topic: &str,
    event: &DomainEvent,
) -> anyhow::Result<()> {
    let payload = event
        .payload()
        .map_err(|e| anyhow::anyhow!("failed to marshal event for {topic}: {e}"))?;
    publisher
        .publish(topic, event.key().as_bytes(), &payload)
        .await
        .map_err(|e| anyhow::anyhow!("failed to produce message for {topic}: {e}"))
}
