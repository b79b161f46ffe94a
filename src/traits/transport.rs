use async_trait::async_trait;

/// Delivers a text message to a single named destination
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> anyhow::Result<()>;
}
