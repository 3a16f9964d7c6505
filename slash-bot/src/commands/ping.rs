//! /ping - 応答確認コマンド

use crate::command::{CommandError, SlashCommand};
use crate::interaction::{CommandArgs, InteractionContext};
use crate::response::InteractionResponder;
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::time::{SystemTime, UNIX_EPOCH};

/// Discordエポック（2015-01-01T00:00:00Z, ミリ秒）
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// /ping コマンドの定義
pub fn descriptor() -> JsonValue {
    json!({
        "name": "ping",
        "description": "ボットの応答を確認します",
        "internal": true
    })
}

pub struct PingCommand;

#[async_trait]
impl SlashCommand for PingCommand {
    async fn execute(
        &self,
        _args: CommandArgs,
        interaction: &InteractionContext,
        responder: &InteractionResponder,
    ) -> Result<(), CommandError> {
        let message = match latency_ms(&interaction.id, now_ms()) {
            Some(ms) => format!("Pong! ({}ms)", ms),
            None => "Pong!".to_string(),
        };
        responder.send_response(interaction, message, false).await?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// スノーフレークIDの作成時刻から現在までの経過ミリ秒
fn latency_ms(snowflake: &str, now_ms: u64) -> Option<u64> {
    let id: u64 = snowflake.parse().ok()?;
    let created = (id >> 22) + DISCORD_EPOCH_MS;
    now_ms.checked_sub(created)
}
