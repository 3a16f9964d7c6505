//! 内部コマンド
//!
//! ボット本体が提供するスラッシュコマンド。プラグイン由来のコマンドは
//! 各プラグインが同じ形（記述子 + `SlashCommand`）で提供する。

pub mod help;
pub mod ping;

use crate::command::SlashCommand;
use crate::registry::SharedCommandRegistry;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// 内部コマンドの記述子と処理の組
pub fn builtin_commands(
    registry: &SharedCommandRegistry,
) -> Vec<(JsonValue, Arc<dyn SlashCommand>)> {
    vec![
        (
            ping::descriptor(),
            Arc::new(ping::PingCommand) as Arc<dyn SlashCommand>,
        ),
        (
            help::descriptor(),
            Arc::new(help::HelpCommand::new(registry)) as Arc<dyn SlashCommand>,
        ),
    ]
}
