use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    configuration::Config,
    error::Error,
    types::{GetUpdates, SendMessage, TelegramResponse, Update},
};

/// Outgoing side of the bot, split out so broadcasts can be driven without
/// a live Bot API.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), Error>;
}

/// Bot API client over plain HTTPS long polling.
pub struct Telegram {
    config: Config,
    client: Client,
}

impl std::fmt::Debug for Telegram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telegram")
            .field("api_url", &self.config.telegram_api_url)
            .finish()
    }
}

impl Telegram {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.get_telegram_url("getMe")?;

        // long polls hold the connection for up to `telegram_poll_timeout`
        let timeout = config.telegram_poll_timeout + config.timeout;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        Ok(Telegram {
            config: config.clone(),
            client,
        })
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, Error> {
        let body = GetUpdates {
            offset,
            timeout: self.config.telegram_poll_timeout,
            allowed_updates: vec!["message"],
        };

        self.call("getUpdates", &body).await
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.get_telegram_url(method)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Telegram(e.without_url().to_string()))?;

        // error replies still carry a JSON envelope with `description`
        let envelope = response
            .json::<TelegramResponse<T>>()
            .await
            .map_err(|e| Error::Telegram(e.without_url().to_string()))?;

        if !envelope.ok {
            return Err(Error::Telegram(format!(
                "{} failed: {}",
                method,
                envelope.description.unwrap_or_default()
            )));
        }

        envelope.result.ok_or_else(|| {
            Error::Telegram(format!("{} returned no result", method))
        })
    }
}

#[async_trait]
impl MessageSender for Telegram {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), Error> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: Some("HTML"),
            disable_web_page_preview: true,
        };

        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }
}
