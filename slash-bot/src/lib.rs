//! slash-bot
//!
//! Discordのスラッシュコマンドを記述子から検証・登録・公開し、
//! 受け取ったインタラクションに応答するためのライブラリ。

pub mod command;
pub mod commands;
pub mod config;
pub mod descriptor;
pub mod format;
pub mod interaction;
pub mod plugin;
pub mod registry;
pub mod response;
pub mod rest;
pub mod security;

pub use command::{
    CommandDeps, CommandDescriptor, CommandError, LoadedCommand, PublishStatus, SlashCommand,
};
pub use config::BotConfig;
pub use descriptor::{CommandOption, CommandSpec};
pub use format::{EmbedFormatter, MessageFormatter, ResponseContent};
pub use interaction::{CommandArgs, InteractionContext};
pub use plugin::{PluginId, PluginIndex};
pub use registry::{CommandRegistry, SharedCommandRegistry};
pub use response::InteractionResponder;
pub use rest::{DiscordRest, HttpRestClient};
