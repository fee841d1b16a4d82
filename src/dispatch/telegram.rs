// src/dispatch/telegram.rs
//! Telegram Bot API dispatcher: `sendMessage` with HTML parse mode, link
//! previews off, and the topic marker as a reply-thread id.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Dispatcher;

pub struct TelegramDispatcher {
    api_base: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramDispatcher {
    pub fn new(token: String) -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            token,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Point at a different API host (tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<u32>,
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    async fn send(&self, destination: &str, text: &str, topic: Option<u32>) -> Result<()> {
        let payload = SendMessagePayload {
            chat_id: destination,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
            message_thread_id: topic,
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(self.endpoint())
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("telegram sendMessage HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("telegram sendMessage request failed: {e}"));
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_is_omitted_for_default_topic() {
        let payload = SendMessagePayload {
            chat_id: "me",
            text: "hi",
            parse_mode: "HTML",
            disable_web_page_preview: true,
            message_thread_id: None,
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert!(v.get("message_thread_id").is_none());
        assert_eq!(v["parse_mode"], "HTML");
    }
}
