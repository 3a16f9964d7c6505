//! /help - 登録済みコマンド一覧

use crate::command::{CommandDescriptor, CommandError, SlashCommand};
use crate::descriptor::CommandOption;
use crate::format::MAX_FIELDS;
use crate::interaction::{CommandArgs, InteractionContext};
use crate::registry::CommandRegistry;
use crate::response::InteractionResponder;
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use serenity::model::application::CommandOptionType;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

/// /help コマンドの定義
pub fn descriptor() -> JsonValue {
    json!({
        "name": "help",
        "description": "利用できるコマンドの一覧を表示します",
        "internal": true,
        "options": [
            CommandOption::new(
                CommandOptionType::String,
                "command",
                "詳しく見たいコマンド名",
            )
            .required(false)
        ]
    })
}

/// レジストリは弱参照で持つ（レジストリ自身がこのコマンドを保持するため）
pub struct HelpCommand {
    registry: Weak<RwLock<CommandRegistry>>,
}

impl HelpCommand {
    pub fn new(registry: &Arc<RwLock<CommandRegistry>>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }
}

#[async_trait]
impl SlashCommand for HelpCommand {
    async fn execute(
        &self,
        args: CommandArgs,
        interaction: &InteractionContext,
        responder: &InteractionResponder,
    ) -> Result<(), CommandError> {
        responder.defer_response(interaction, true).await?;

        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| CommandError::Execution("command registry is gone".to_string()))?;
        let descriptors = registry.read().await.descriptors();

        let embed = match args.get_str("command") {
            Some(name) => match descriptors.iter().find(|d| d.name() == name) {
                Some(descriptor) => detail_embed(descriptor),
                None => {
                    let message = format!("コマンド /{} は見つかりませんでした。", name);
                    responder.edit_response(interaction, message).await?;
                    return Ok(());
                }
            },
            None => list_embed(&descriptors),
        };

        responder.edit_response(interaction, json!({ "embed": embed })).await?;
        Ok(())
    }
}

fn origin(descriptor: &CommandDescriptor) -> String {
    match descriptor.plugin() {
        Some(plugin) => format!("プラグイン: {}", plugin),
        None if descriptor.internal() => "内部コマンド".to_string(),
        None => "提供元不明".to_string(),
    }
}

/// Embedのフィールド上限を超える分は表示せず、その旨を説明文に書く
fn list_embed(descriptors: &[Arc<CommandDescriptor>]) -> JsonValue {
    let fields: Vec<JsonValue> = descriptors
        .iter()
        .take(MAX_FIELDS)
        .map(|d| {
            let staff = if d.staff_only() { "（スタッフ専用）" } else { "" };
            json!({
                "name": format!("/{}{}", d.name(), staff),
                "value": format!("{}\n{}", d.description(), origin(d)),
            })
        })
        .collect();

    let mut description = format!("{}件のコマンドが利用できます", descriptors.len());
    if descriptors.len() > MAX_FIELDS {
        description.push_str(&format!(
            "（先頭{}件を表示しています。`/help command:<名前>` で個別に確認できます）",
            MAX_FIELDS
        ));
    }

    json!({
        "title": "コマンド一覧",
        "description": description,
        "fields": fields,
    })
}

fn detail_embed(descriptor: &CommandDescriptor) -> JsonValue {
    let mut fields = vec![json!({ "name": "提供元", "value": origin(descriptor) })];

    if !descriptor.permissions().is_empty() {
        fields.push(json!({
            "name": "必要な権限",
            "value": descriptor.permissions().join(", "),
        }));
    }

    for option in descriptor.options() {
        let required = if option.is_required() { "（必須）" } else { "" };
        fields.push(json!({
            "name": format!("{}{}", option.name, required),
            "value": option.description,
            "inline": true,
        }));
    }

    json!({
        "title": format!("/{}", descriptor.name()),
        "description": descriptor.description(),
        "fields": fields,
    })
}
