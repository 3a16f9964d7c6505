//! コマンド記述子のデータモデル
//!
//! プラグインや内部コマンドが宣言するプレーンな記述子（JSON）と、
//! Discordへ公開するペイロードを定義する。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serenity::model::application::CommandOptionType;
use thiserror::Error;

/// CHAT_INPUT（スラッシュコマンド）のアプリケーションコマンド種別
pub const CHAT_INPUT_COMMAND: u8 = 1;

/// 記述子の読み取りエラー
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// オブジェクト以外が渡された
    #[error("Descriptor must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("Malformed descriptor: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// オプションの選択肢
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionChoice {
    pub name: String,
    pub value: JsonValue,
}

/// コマンドオプション
///
/// サブコマンド・サブコマンドグループは `options` に子を持つ。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: CommandOptionType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<OptionChoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<CommandOption>>,
}

impl CommandOption {
    pub fn new(
        kind: CommandOptionType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: None,
            choices: None,
            options: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// サブコマンドまたはサブコマンドグループか
    pub fn is_subcommand(&self) -> bool {
        matches!(
            self.kind,
            CommandOptionType::SubCommand | CommandOptionType::SubCommandGroup
        )
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    /// 子オプション（なければ空）
    pub fn sub_options(&self) -> &[CommandOption] {
        self.options.as_deref().unwrap_or(&[])
    }
}

/// プラグインが宣言するコマンド記述子
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    /// スタッフ専用フラグ（Discordには送らない）
    #[serde(default, alias = "staffOnly")]
    pub staff_only: bool,
    /// 必要なパーミッション名（Discordには送らない）
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// ボット本体のコマンドか（プラグイン由来でないか）
    #[serde(default)]
    pub internal: bool,
}

impl CommandSpec {
    /// JSON値から記述子を読み取る
    ///
    /// オブジェクト以外は `DescriptorError::NotAnObject` になる。
    pub fn from_value(raw: JsonValue) -> Result<Self, DescriptorError> {
        if !raw.is_object() {
            return Err(DescriptorError::NotAnObject(json_kind(&raw)));
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Discordへ公開するペイロードを生成
    pub fn payload(&self) -> CommandPayload {
        CommandPayload {
            kind: CHAT_INPUT_COMMAND,
            name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
        }
    }
}

/// `POST /applications/{id}/commands` のボディ
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

/// JSON値の種類名（エラーメッセージ用）
pub fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
