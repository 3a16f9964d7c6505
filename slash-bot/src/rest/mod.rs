//! Discord REST抽象化レイヤー
//!
//! コマンド公開とインタラクション応答で使うHTTP呼び出しをtraitで抽象化する。

mod http;
#[cfg(test)]
mod mock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub use http::HttpRestClient;
#[cfg(test)]
pub use mock::MockRestClient;

/// デフォルトのAPIベースURL
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// RESTエラー
#[derive(Debug, Error)]
pub enum RestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// パスに含まれるトークンはマスク済み
    #[error("API returned {status} for {path}: {body}")]
    ApiError { status: u16, path: String, body: String },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Post,
    Patch,
}

impl RestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestMethod::Get => "GET",
            RestMethod::Post => "POST",
            RestMethod::Patch => "PATCH",
        }
    }
}

/// 1回分のREST呼び出し
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: RestMethod,
    /// ベースURLからの相対パス（`/` 始まり）
    pub path: String,
    pub body: Option<JsonValue>,
}

impl RestRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: RestMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: RestMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: RestMethod::Patch,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Discord RESTクライアントtrait
#[async_trait]
pub trait DiscordRest: Send + Sync {
    /// リクエストを送信し、レスポンスボディを返す（空ボディは `Null`）
    async fn send(&self, request: RestRequest) -> Result<JsonValue, RestError>;
}

/// エンドポイントのパス
pub mod routes {
    /// `/applications/{app_id}/commands`
    pub fn application_commands(application_id: &str) -> String {
        format!("/applications/{}/commands", application_id)
    }

    /// `/interactions/{id}/{token}/callback`
    pub fn interaction_callback(interaction_id: &str, token: &str) -> String {
        format!("/interactions/{}/{}/callback", interaction_id, token)
    }

    /// `/webhooks/{app_id}/{token}/messages/@original`
    pub fn original_response(application_id: &str, token: &str) -> String {
        format!("/webhooks/{}/{}/messages/@original", application_id, token)
    }
}
