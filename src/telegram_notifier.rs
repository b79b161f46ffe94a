use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::traits::transport::NotificationTransport;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API transport; destinations are chat ids
#[derive(Clone)]
pub struct TelegramTransport {
  client: Client,
  token: String,
  api_base: String,
}

impl TelegramTransport {
  pub fn new(token: String) -> Self {
    Self::with_api_base(token, TELEGRAM_API.to_string())
  }

  /// Point the transport at a different Bot API host
  pub fn with_api_base(token: String, api_base: String) -> Self {
    Self { client: Client::new(), token, api_base }
  }

  fn send_message_url(&self) -> String {
    format!("{}/bot{}/sendMessage", self.api_base.trim_end_matches('/'), self.token)
  }
}

#[async_trait]
impl NotificationTransport for TelegramTransport {
  /// Send one message to one chat
  async fn send(&self, destination: &str, text: &str) -> anyhow::Result<()> {
    let payload = serde_json::json!({
        "chat_id": destination,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true
    });

    let response = self
      .client
      .post(self.send_message_url())
      .body(payload.to_string())
      .header("Content-Type", "application/json")
      .send()
      .await?;

    let response_status = response.status();
    if !response_status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!("Telegram API response: {}", body);
      anyhow::bail!("Telegram API error: Status {}", response_status);
    }

    debug!("Telegram message sent to chat {}", destination);
    Ok(())
  }
}
