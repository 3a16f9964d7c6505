//! メッセージ整形
//!
//! 構造化コンテンツ（`{"embed": {...}}` など）をDiscordのメッセージフィールドに変換する。

use crate::descriptor::json_kind;
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::debug;

/// Discordのデフォルトカラー（blurple）
pub const DEFAULT_EMBED_COLOR: u32 = 0x5865F2;
/// 1メッセージあたりのEmbed上限
pub const MAX_EMBEDS: usize = 10;
/// 1EmbedあたりのField上限
pub const MAX_FIELDS: usize = 25;

const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FOOTER_LIMIT: usize = 2048;

/// 整形エラー
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Structured content must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("Structured content has no embed")]
    MissingEmbed,

    #[error("Embed must be an object, got {0}")]
    InvalidEmbed(&'static str),

    #[error("Too many embeds: {0} (max {max})", max = MAX_EMBEDS)]
    TooManyEmbeds(usize),
}

/// 応答内容
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseContent {
    /// プレーンテキスト
    Text(String),
    /// 構造化コンテンツ（フォーマッターを通す）
    Structured(JsonValue),
}

impl From<&str> for ResponseContent {
    fn from(text: &str) -> Self {
        ResponseContent::Text(text.to_string())
    }
}

impl From<String> for ResponseContent {
    fn from(text: String) -> Self {
        ResponseContent::Text(text)
    }
}

/// オブジェクトだけがフォーマッターを通り、それ以外はテキストとして送る
impl From<JsonValue> for ResponseContent {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(_) => ResponseContent::Structured(value),
            JsonValue::String(text) => ResponseContent::Text(text),
            other => ResponseContent::Text(other.to_string()),
        }
    }
}

/// メッセージフォーマッターtrait
#[async_trait]
pub trait MessageFormatter: Send + Sync {
    /// 構造化コンテンツをメッセージのフィールド（`embeds` など）に変換
    async fn format(
        &self,
        channel_id: Option<&str>,
        content: &JsonValue,
    ) -> Result<Map<String, JsonValue>, FormatError>;
}

/// Embed用のデフォルトフォーマッター
///
/// 受け付ける形:
/// - `{"embed": {...}}`
/// - `{"embeds": [{...}, ...]}`
/// - Embedそのもの（`title` / `description` / `fields` などを持つオブジェクト）
///
/// `content` と `components` はそのまま引き継ぐ。
#[derive(Debug, Clone)]
pub struct EmbedFormatter {
    color: u32,
}

impl EmbedFormatter {
    pub fn new(color: u32) -> Self {
        Self { color }
    }

    fn normalize_embed(&self, embed: &JsonValue) -> Result<JsonValue, FormatError> {
        let mut embed = match embed {
            JsonValue::Object(map) => map.clone(),
            other => return Err(FormatError::InvalidEmbed(json_kind(other))),
        };

        embed
            .entry("color")
            .or_insert_with(|| JsonValue::from(self.color));

        truncate_field(&mut embed, "title", TITLE_LIMIT);
        truncate_field(&mut embed, "description", DESCRIPTION_LIMIT);
        if let Some(JsonValue::Object(footer)) = embed.get_mut("footer") {
            truncate_field(footer, "text", FOOTER_LIMIT);
        }
        if let Some(JsonValue::Array(fields)) = embed.get_mut("fields") {
            fields.truncate(MAX_FIELDS);
        }

        Ok(JsonValue::Object(embed))
    }
}

impl Default for EmbedFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_EMBED_COLOR)
    }
}

#[async_trait]
impl MessageFormatter for EmbedFormatter {
    async fn format(
        &self,
        channel_id: Option<&str>,
        content: &JsonValue,
    ) -> Result<Map<String, JsonValue>, FormatError> {
        let object = content
            .as_object()
            .ok_or_else(|| FormatError::NotAnObject(json_kind(content)))?;

        let raw_embeds: Vec<&JsonValue> =
            if let Some(JsonValue::Array(embeds)) = object.get("embeds") {
                embeds.iter().collect()
            } else if let Some(embed) = object.get("embed") {
                vec![embed]
            } else if looks_like_embed(object) {
                vec![content]
            } else {
                return Err(FormatError::MissingEmbed);
            };

        if raw_embeds.len() > MAX_EMBEDS {
            return Err(FormatError::TooManyEmbeds(raw_embeds.len()));
        }

        let embeds = raw_embeds
            .into_iter()
            .map(|embed| self.normalize_embed(embed))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Formatted {} embeds for channel {}",
            embeds.len(),
            channel_id.unwrap_or("-")
        );

        let mut fields = Map::new();
        fields.insert("embeds".to_string(), JsonValue::Array(embeds));
        for key in ["content", "components"] {
            if let Some(value) = object.get(key) {
                fields.insert(key.to_string(), value.clone());
            }
        }
        Ok(fields)
    }
}

fn looks_like_embed(object: &Map<String, JsonValue>) -> bool {
    ["title", "description", "fields", "author", "footer", "image", "thumbnail"]
        .iter()
        .any(|key| object.contains_key(*key))
}

fn truncate_field(map: &mut Map<String, JsonValue>, key: &str, limit: usize) {
    if let Some(JsonValue::String(text)) = map.get_mut(key) {
        if text.chars().count() > limit {
            let mut truncated: String = text.chars().take(limit - 1).collect();
            truncated.push('…');
            *text = truncated;
        }
    }
}
