//! reqwestによるDiscord REST実装

use super::{DiscordRest, RestError, RestMethod, RestRequest};
use crate::config::BotConfig;
use crate::security::mask_secrets;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, error};

pub struct HttpRestClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRestClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// 設定から作成
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(&config.api_base, &config.token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl DiscordRest for HttpRestClient {
    async fn send(&self, request: RestRequest) -> Result<JsonValue, RestError> {
        let masked_path = mask_secrets(&request.path);
        let url = self.url(&request.path);

        let builder = match request.method {
            RestMethod::Get => self.client.get(&url),
            RestMethod::Post => self.client.post(&url),
            RestMethod::Patch => self.client.patch(&url),
        };
        let builder = builder.header("Authorization", format!("Bot {}", self.token));
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        debug!("{} {}", request.method.as_str(), masked_path);

        // reqwestのエラーはURL（=トークン）を含むので外す
        let http_response = builder.send().await.map_err(|e| e.without_url())?;

        let status = http_response.status();
        debug!("API status: {} for {}", status, masked_path);

        if !status.is_success() {
            let body = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error".to_string());
            error!(
                "API returned {} for {} {}",
                status,
                request.method.as_str(),
                masked_path
            );
            return Err(api_error(status.as_u16(), masked_path, &body));
        }

        let text = http_response.text().await.map_err(|e| e.without_url())?;
        if text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// エラーボディに紛れたトークンも伏せる
fn api_error(status: u16, masked_path: String, body: &str) -> RestError {
    RestError::ApiError {
        status,
        path: masked_path,
        body: mask_secrets(body),
    }
}
