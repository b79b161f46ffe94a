// src/notifications/mod.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::traits::transport::NotificationTransport;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans a message out to every configured destination. Each destination is
/// attempted once; failures are logged and never retried.
pub struct Notifier {
    transport: Arc<dyn NotificationTransport>,
    destinations: Vec<String>,
    send_timeout: Duration,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        destinations: Vec<String>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            destinations,
            send_timeout,
        }
    }

    /// Deliver `text` to all destinations in order
    pub async fn broadcast(&self, text: &str) -> DeliverySummary {
        let mut summary = DeliverySummary::default();

        for destination in &self.destinations {
            let result =
                tokio::time::timeout(self.send_timeout, self.transport.send(destination, text))
                    .await;

            match result {
                Ok(Ok(())) => {
                    info!("Message sent successfully to destination: {}", destination);
                    summary.delivered += 1;
                }
                Ok(Err(e)) => {
                    error!("Failed to send message to {}: {:#}", destination, e);
                    summary.failed += 1;
                }
                Err(_) => {
                    error!(
                        "Sending to {} timed out after {:?}",
                        destination, self.send_timeout
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and fails for the destinations it was told to
    struct RecordingTransport {
        failing: Vec<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingTransport {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NotificationTransport for RecordingTransport {
        async fn send(&self, destination: &str, text: &str) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((destination.to_string(), text.to_string()));
            if self.failing.iter().any(|d| d == destination) {
                anyhow::bail!("chat not found");
            }
            Ok(())
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl NotificationTransport for HangingTransport {
        async fn send(&self, _destination: &str, _text: &str) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn destinations(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failure_on_one_destination_does_not_block_the_rest() {
        let transport = Arc::new(RecordingTransport::new(&["b"]));
        let notifier = Notifier::new(
            transport.clone(),
            destinations(&["a", "b", "c"]),
            Duration::from_secs(5),
        );

        let summary = notifier.broadcast("hello").await;

        assert_eq!(summary, DeliverySummary { delivered: 2, failed: 1 });
        let calls = transport.calls.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(calls.iter().all(|(_, text)| text == "hello"));
    }

    #[tokio::test]
    async fn failed_destination_is_not_retried() {
        let transport = Arc::new(RecordingTransport::new(&["a"]));
        let notifier = Notifier::new(transport.clone(), destinations(&["a"]), Duration::from_secs(5));

        notifier.broadcast("x").await;

        assert_eq!(transport.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_send_counts_as_failure() {
        let notifier = Notifier::new(
            Arc::new(HangingTransport),
            destinations(&["a", "b"]),
            Duration::from_secs(2),
        );

        let summary = notifier.broadcast("x").await;

        assert_eq!(summary, DeliverySummary { delivered: 0, failed: 2 });
    }
}
