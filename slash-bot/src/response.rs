//! インタラクション応答
//!
//! defer / send / edit の3種類の応答をDiscordに送る。
//! いずれも結果を返し、失敗をどう扱うかは呼び出し側が決める。

use crate::format::{FormatError, MessageFormatter, ResponseContent};
use crate::interaction::InteractionContext;
use crate::rest::{routes, DiscordRest, RestError, RestRequest};
use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// CHANNEL_MESSAGE_WITH_SOURCE
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
/// DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE
pub const DEFERRED_CHANNEL_MESSAGE: u8 = 5;
/// 本人にだけ見えるメッセージのフラグ
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// 応答エラー
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

/// `secret` からメッセージフラグを求める
pub fn flags(secret: bool) -> u64 {
    if secret {
        EPHEMERAL_FLAG
    } else {
        0
    }
}

/// defer応答のボディ
pub fn defer_payload(secret: bool) -> JsonValue {
    json!({
        "type": DEFERRED_CHANNEL_MESSAGE,
        "flags": flags(secret),
    })
}

/// テキスト応答のボディ
pub fn text_payload(content: &str, secret: bool) -> JsonValue {
    json!({
        "type": CHANNEL_MESSAGE_WITH_SOURCE,
        "flags": flags(secret),
        "content": content,
    })
}

/// 構造化応答のボディ（`data` はフォーマッターの出力）
pub fn structured_payload(data: Map<String, JsonValue>, secret: bool) -> JsonValue {
    json!({
        "type": CHANNEL_MESSAGE_WITH_SOURCE,
        "flags": flags(secret),
        "data": data,
    })
}

/// インタラクション応答の送信係
#[derive(Clone)]
pub struct InteractionResponder {
    rest: Arc<dyn DiscordRest>,
    formatter: Arc<dyn MessageFormatter>,
    application_id: String,
}

impl InteractionResponder {
    pub fn new(
        rest: Arc<dyn DiscordRest>,
        formatter: Arc<dyn MessageFormatter>,
        application_id: impl Into<String>,
    ) -> Self {
        Self {
            rest,
            formatter,
            application_id: application_id.into(),
        }
    }

    pub fn rest(&self) -> &Arc<dyn DiscordRest> {
        &self.rest
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// 応答を保留する（type 5）
    ///
    /// 実際の内容は後で `edit_response` で送る。
    pub async fn defer_response(
        &self,
        interaction: &InteractionContext,
        secret: bool,
    ) -> Result<(), ResponseError> {
        debug!("Deferring interaction {} (secret: {})", interaction.id, secret);
        self.rest
            .send(RestRequest::post(
                routes::interaction_callback(&interaction.id, &interaction.token),
                defer_payload(secret),
            ))
            .await?;
        Ok(())
    }

    /// 応答を送る（type 4）
    pub async fn send_response(
        &self,
        interaction: &InteractionContext,
        content: impl Into<ResponseContent>,
        secret: bool,
    ) -> Result<(), ResponseError> {
        let body = match content.into() {
            ResponseContent::Text(text) => text_payload(&text, secret),
            ResponseContent::Structured(value) => {
                let data = self
                    .formatter
                    .format(interaction.channel_id.as_deref(), &value)
                    .await?;
                structured_payload(data, secret)
            }
        };

        debug!("Responding to interaction {} (secret: {})", interaction.id, secret);
        self.rest
            .send(RestRequest::post(
                routes::interaction_callback(&interaction.id, &interaction.token),
                body,
            ))
            .await?;
        Ok(())
    }

    /// 送信済みの応答を書き換える
    ///
    /// 公開範囲は後から変えられないのでフラグは送らない。
    pub async fn edit_response(
        &self,
        interaction: &InteractionContext,
        content: impl Into<ResponseContent>,
    ) -> Result<(), ResponseError> {
        let body = match content.into() {
            ResponseContent::Text(text) => json!({ "content": text }),
            ResponseContent::Structured(value) => {
                let mut data = self
                    .formatter
                    .format(interaction.channel_id.as_deref(), &value)
                    .await?;
                let embeds = data.remove("embeds").unwrap_or_else(|| json!([]));
                json!({ "embeds": embeds })
            }
        };

        debug!("Editing response for interaction {}", interaction.id);
        self.rest
            .send(RestRequest::patch(
                routes::original_response(&self.application_id, &interaction.token),
                body,
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::EmbedFormatter;
    use crate::rest::{MockRestClient, RestMethod};

    fn interaction() -> InteractionContext {
        InteractionContext {
            id: "111".to_string(),
            kind: 2,
            data: json!({ "name": "test" }),
            guild_id: Some("222".to_string()),
            channel_id: Some("333".to_string()),
            member: None,
            token: "token-abc".to_string(),
        }
    }

    fn responder(rest: Arc<MockRestClient>) -> InteractionResponder {
        InteractionResponder::new(rest, Arc::new(EmbedFormatter::new(7)), "999")
    }

    #[test]
    fn test_flags() {
        assert_eq!(flags(true), 64);
        assert_eq!(flags(false), 0);
    }

    #[tokio::test]
    async fn test_defer_secret() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone()).defer_response(&interaction(), true).await.unwrap();

        let request = rest.last_request().unwrap();
        assert_eq!(request.method, RestMethod::Post);
        assert_eq!(request.path, "/interactions/111/token-abc/callback");
        let body = request.body.unwrap();
        assert_eq!(body["type"], 5);
        assert_eq!(body["flags"].as_u64().unwrap() & EPHEMERAL_FLAG, EPHEMERAL_FLAG);
    }

    #[tokio::test]
    async fn test_defer_public() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone()).defer_response(&interaction(), false).await.unwrap();

        let body = rest.last_request().unwrap().body.unwrap();
        assert_eq!(body["type"], 5);
        assert_eq!(body["flags"].as_u64().unwrap() & EPHEMERAL_FLAG, 0);
    }

    #[tokio::test]
    async fn test_send_text() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone())
            .send_response(&interaction(), "hello", false)
            .await
            .unwrap();

        let body = rest.last_request().unwrap().body.unwrap();
        assert_eq!(body["type"], 4);
        assert_eq!(body["content"], "hello");
        assert!(body.get("data").is_none());
        assert_eq!(body["flags"], 0);
    }

    #[tokio::test]
    async fn test_send_structured_secret() {
        let rest = Arc::new(MockRestClient::new());
        let content = json!({ "embed": { "title": "Stats" } });
        responder(rest.clone())
            .send_response(&interaction(), content.clone(), true)
            .await
            .unwrap();

        let expected = EmbedFormatter::new(7)
            .format(Some("333"), &content)
            .await
            .unwrap();

        let body = rest.last_request().unwrap().body.unwrap();
        assert_eq!(body["type"], 4);
        assert_eq!(body["data"], JsonValue::Object(expected));
        assert!(body.get("content").is_none());
        assert_eq!(body["flags"].as_u64().unwrap() & EPHEMERAL_FLAG, EPHEMERAL_FLAG);
    }

    #[tokio::test]
    async fn test_send_structured_format_error_sends_nothing() {
        let rest = Arc::new(MockRestClient::new());
        let result = responder(rest.clone())
            .send_response(&interaction(), json!({ "nothing": true }), false)
            .await;

        assert!(matches!(result, Err(ResponseError::Format(FormatError::MissingEmbed))));
        assert_eq!(rest.request_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_structured() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone())
            .edit_response(&interaction(), json!({ "embed": { "title": "Done" } }))
            .await
            .unwrap();

        let request = rest.last_request().unwrap();
        assert_eq!(request.method, RestMethod::Patch);
        assert_eq!(request.path, "/webhooks/999/token-abc/messages/@original");
        let body = request.body.unwrap();
        assert_eq!(body["embeds"][0]["title"], "Done");
        assert!(body.get("content").is_none());
        assert!(body.get("flags").is_none());
    }

    #[tokio::test]
    async fn test_edit_text() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone())
            .edit_response(&interaction(), "text")
            .await
            .unwrap();

        let body = rest.last_request().unwrap().body.unwrap();
        assert_eq!(body, json!({ "content": "text" }));
    }

    #[tokio::test]
    async fn test_send_non_object_json_as_text() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone())
            .send_response(&interaction(), json!(42), false)
            .await
            .unwrap();

        let body = rest.last_request().unwrap().body.unwrap();
        assert_eq!(body["type"], 4);
        assert_eq!(body["content"], "42");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_edit_non_object_json_as_text() {
        let rest = Arc::new(MockRestClient::new());
        responder(rest.clone())
            .edit_response(&interaction(), json!(true))
            .await
            .unwrap();

        let body = rest.last_request().unwrap().body.unwrap();
        assert_eq!(body, json!({ "content": "true" }));
    }

    #[tokio::test]
    async fn test_network_failure_is_returned() {
        let rest = Arc::new(MockRestClient::failing(503));
        let result = responder(rest).send_response(&interaction(), "hello", false).await;

        assert!(matches!(
            result,
            Err(ResponseError::Rest(RestError::ApiError { status: 503, .. }))
        ));
    }
}
