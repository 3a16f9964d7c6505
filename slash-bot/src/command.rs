//! スラッシュコマンド
//!
//! `CommandDescriptor::create` が記述子の検証・登録・公開をまとめて行い、
//! 各コマンドの処理は `SlashCommand` を実装して渡す。

use crate::descriptor::{CommandOption, CommandSpec, DescriptorError};
use crate::format::ResponseContent;
use crate::interaction::{CommandArgs, InteractionContext};
use crate::plugin::{PluginId, PluginIndex};
use crate::registry::{RegistryError, SharedCommandRegistry};
use crate::response::{InteractionResponder, ResponseError};
use crate::rest::{routes, RestError, RestRequest};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// コマンドエラー
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("Validation failed: {0}")]
    Validation(#[from] RegistryError),

    #[error("Response failed: {0}")]
    Response(#[from] ResponseError),

    #[error("Execution failed: {0}")]
    Execution(String),
}

/// コマンド処理trait - すべてのコマンドが実装する
#[async_trait]
pub trait SlashCommand: Send + Sync {
    /// コマンド実行
    ///
    /// # Arguments
    /// * `args` - 正規化済みの引数とチャンネル・ギルド・メンバー・トークン
    /// * `interaction` - 受信したインタラクションそのもの
    /// * `responder` - 応答の送信に使う
    async fn execute(
        &self,
        args: CommandArgs,
        interaction: &InteractionContext,
        responder: &InteractionResponder,
    ) -> Result<(), CommandError>;
}

/// コマンド構築に必要な依存
#[derive(Clone)]
pub struct CommandDeps {
    pub registry: SharedCommandRegistry,
    pub plugins: Arc<PluginIndex>,
    pub responder: InteractionResponder,
}

impl CommandDeps {
    pub fn new(
        registry: SharedCommandRegistry,
        plugins: Arc<PluginIndex>,
        responder: InteractionResponder,
    ) -> Self {
        Self {
            registry,
            plugins,
            responder,
        }
    }
}

/// 定義の公開結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Published,
    Failed(String),
}

impl PublishStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishStatus::Published)
    }
}

/// 構築結果
#[derive(Debug)]
pub struct LoadedCommand {
    pub descriptor: Arc<CommandDescriptor>,
    /// レジストリに登録できたか（できなければこのコマンドは呼ばれない）
    pub registered: bool,
    pub publish: PublishStatus,
}

/// コマンド記述子
pub struct CommandDescriptor {
    spec: CommandSpec,
    plugin: Option<PluginId>,
    handler: Arc<dyn SlashCommand>,
    responder: InteractionResponder,
}

impl CommandDescriptor {
    /// 記述子を構築し、検証・登録・公開する
    ///
    /// 1. オブジェクト以外は `CommandError::Descriptor` で即失敗（登録・通信なし）
    /// 2. 内部コマンドでなければ宣言元プラグインを引く
    /// 3. `check` の失敗は呼び出し元に返す
    /// 4. `register` の失敗はログに残して続行する
    /// 5. 定義を公開し、結果を `LoadedCommand::publish` に入れる
    pub async fn create(
        deps: &CommandDeps,
        raw: JsonValue,
        handler: Arc<dyn SlashCommand>,
    ) -> Result<LoadedCommand, CommandError> {
        let spec = CommandSpec::from_value(raw)?;

        let plugin = if spec.internal {
            None
        } else {
            deps.plugins.plugin_for(&spec.name).cloned()
        };

        deps.registry.read().await.check(&spec)?;

        let descriptor = Arc::new(Self {
            spec,
            plugin,
            handler,
            responder: deps.responder.clone(),
        });

        let registered = match deps.registry.write().await.register(descriptor.clone()) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to register command '{}': {}", descriptor.name(), e);
                false
            }
        };

        let publish = match descriptor.publish().await {
            Ok(()) => PublishStatus::Published,
            Err(e) => {
                warn!("Failed to publish command '{}': {}", descriptor.name(), e);
                PublishStatus::Failed(e.to_string())
            }
        };

        let name = descriptor.name();
        match descriptor.plugin() {
            Some(plugin) => {
                info!(target: "commands", "Loaded command /{} from plugin {}", name, plugin)
            }
            None if descriptor.internal() => {
                info!(target: "commands", "Loaded internal command /{}", name)
            }
            None => info!(target: "commands", "Loaded command /{} (no declaring plugin)", name),
        }

        Ok(LoadedCommand {
            descriptor,
            registered,
            publish,
        })
    }

    /// 定義をDiscordに公開
    async fn publish(&self) -> Result<(), ResponseError> {
        let body = serde_json::to_value(self.spec.payload()).map_err(RestError::from)?;
        let path = routes::application_commands(self.responder.application_id());
        debug!("Publishing command '{}'", self.name());
        self.responder.rest().send(RestRequest::post(path, body)).await?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    pub fn staff_only(&self) -> bool {
        self.spec.staff_only
    }

    pub fn permissions(&self) -> &[String] {
        &self.spec.permissions
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.spec.options
    }

    pub fn internal(&self) -> bool {
        self.spec.internal
    }

    /// 宣言元プラグイン（内部コマンドは常にNone）
    pub fn plugin(&self) -> Option<&PluginId> {
        self.plugin.as_ref()
    }

    /// インタラクションを処理する
    pub async fn execute(&self, interaction: &InteractionContext) -> Result<(), CommandError> {
        let args = CommandArgs::from_interaction(interaction);
        debug!("Executing command /{} for interaction {}", self.name(), interaction.id);
        self.handler.execute(args, interaction, &self.responder).await
    }

    pub async fn defer_response(
        &self,
        interaction: &InteractionContext,
        secret: bool,
    ) -> Result<(), ResponseError> {
        self.responder.defer_response(interaction, secret).await
    }

    pub async fn send_response(
        &self,
        interaction: &InteractionContext,
        content: impl Into<ResponseContent>,
        secret: bool,
    ) -> Result<(), ResponseError> {
        self.responder.send_response(interaction, content, secret).await
    }

    pub async fn edit_response(
        &self,
        interaction: &InteractionContext,
        content: impl Into<ResponseContent>,
    ) -> Result<(), ResponseError> {
        self.responder.edit_response(interaction, content).await
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("spec", &self.spec)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}
