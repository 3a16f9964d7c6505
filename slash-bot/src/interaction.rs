//! インタラクションコンテキスト
//!
//! Gatewayから受け取ったコマンドインタラクションのうち、応答の宛先指定と
//! 引数の取り出しに必要な値だけを保持する。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use serenity::model::application::{CommandData, CommandInteraction, InteractionType};

/// 受信したインタラクション
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionContext {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: JsonValue,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<JsonValue>,
    pub token: String,
}

impl InteractionContext {
    /// serenityのコマンドインタラクションから作成
    ///
    /// `CommandInteraction` は常にアプリケーションコマンドなので種別は固定。
    pub fn from_command(command: &CommandInteraction) -> Self {
        Self {
            id: command.id.to_string(),
            kind: u8::from(InteractionType::Command),
            data: command_data_value(&command.data),
            guild_id: command.guild_id.map(|id| id.to_string()),
            channel_id: Some(command.channel_id.to_string()),
            member: command
                .member
                .as_ref()
                .and_then(|member| serde_json::to_value(member).ok()),
            token: command.token.clone(),
        }
    }

    /// 呼び出されたコマンド名
    pub fn command_name(&self) -> Option<&str> {
        self.data.get("name").and_then(|name| name.as_str())
    }
}

/// `CommandData` をGatewayと同じJSON形に戻す
fn command_data_value(data: &CommandData) -> JsonValue {
    serde_json::to_value(data).unwrap_or(JsonValue::Null)
}

/// コマンドに渡す正規化済みの引数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    /// オプション名 -> 値（サブコマンドは入れ子のオブジェクト）
    pub options: Map<String, JsonValue>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub member: Option<JsonValue>,
    pub token: String,
}

impl CommandArgs {
    pub fn from_interaction(interaction: &InteractionContext) -> Self {
        let options = interaction
            .data
            .get("options")
            .and_then(|options| options.as_array())
            .map(|options| normalize_options(options))
            .unwrap_or_default();

        Self {
            options,
            channel_id: interaction.channel_id.clone(),
            guild_id: interaction.guild_id.clone(),
            member: interaction.member.clone(),
            token: interaction.token.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.options.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    /// 最初のサブコマンド（名前と引数）
    pub fn subcommand(&self) -> Option<(&str, &Map<String, JsonValue>)> {
        self.options
            .iter()
            .find_map(|(name, value)| value.as_object().map(|args| (name.as_str(), args)))
    }
}

/// Discordの `options` 配列を名前 -> 値のマップに変換
fn normalize_options(options: &[JsonValue]) -> Map<String, JsonValue> {
    let mut map = Map::new();

    for option in options {
        let Some(name) = option.get("name").and_then(|n| n.as_str()) else {
            continue;
        };

        let value = if let Some(JsonValue::Array(children)) = option.get("options") {
            JsonValue::Object(normalize_options(children))
        } else if let Some(value) = option.get("value") {
            value.clone()
        } else {
            // 引数なしのサブコマンド
            JsonValue::Object(Map::new())
        };

        map.insert(name.to_string(), value);
    }

    map
}
