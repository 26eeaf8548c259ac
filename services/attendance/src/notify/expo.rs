//! Expo push service client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{PushError, PushGateway, PushMessage};

/// Expo's push send endpoint.
pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Expo client configuration.
#[derive(Debug, Clone)]
pub struct ExpoPushConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for ExpoPushConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_EXPO_PUSH_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    data: Option<PushTicket>,
}

#[derive(Debug, Deserialize)]
struct PushTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Push gateway backed by the Expo push API.
#[derive(Clone)]
pub struct ExpoPushClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ExpoPushClient {
    pub fn new(config: &ExpoPushConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for ExpoPushClient {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        debug!(endpoint = %self.endpoint, title = %message.title, "Sending push message");

        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PushError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Expo reports per-message failures inside a 200 response.
        if let Ok(PushResponse {
            data: Some(ticket),
        }) = serde_json::from_str::<PushResponse>(&body)
        {
            if ticket.status == "error" {
                return Err(PushError::Rejected(
                    ticket.message.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
        }

        Ok(())
    }
}
