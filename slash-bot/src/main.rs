use anyhow::Context as _;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use slash_bot::command::{CommandDeps, CommandDescriptor, PublishStatus};
use slash_bot::commands;
use slash_bot::config::BotConfig;
use slash_bot::format::EmbedFormatter;
use slash_bot::interaction::InteractionContext;
use slash_bot::plugin::PluginIndex;
use slash_bot::registry::{CommandRegistry, SharedCommandRegistry};
use slash_bot::response::InteractionResponder;
use slash_bot::rest::HttpRestClient;
use slash_bot::security::SecretMasker;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct Handler {
    registry: SharedCommandRegistry,
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let registry = self.registry.read().await;
        info!(
            "{} is connected! ({} commands: {})",
            ready.user.name,
            registry.len(),
            registry.list_commands().join(", ")
        );
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let context = InteractionContext::from_command(&command);
        let descriptor = self.registry.read().await.get(&command.data.name);

        let Some(descriptor) = descriptor else {
            warn!("Received unknown command: /{}", command.data.name);
            return;
        };

        // 各インタラクションは独立したタスクで処理する
        tokio::spawn(async move {
            debug!("Handling /{} ({})", descriptor.name(), context.id);
            if let Err(e) = descriptor.execute(&context).await {
                let message = e.to_string();
                error!("Command /{} failed: {}", descriptor.name(), SecretMasker::new(&message));
            }
        });
    }
}

/// 内部コマンドを構築して公開する
async fn load_builtin_commands(deps: &CommandDeps) {
    let builtins = commands::builtin_commands(&deps.registry);
    let total = builtins.len();
    let mut published = 0;

    for (raw, handler) in builtins {
        match CommandDescriptor::create(deps, raw, handler).await {
            Ok(loaded) => {
                if loaded.publish.is_published() {
                    published += 1;
                } else if let PublishStatus::Failed(reason) = &loaded.publish {
                    warn!(
                        "/{} is registered locally but not published: {}",
                        loaded.descriptor.name(),
                        reason
                    );
                }
            }
            Err(e) => error!("Failed to load command: {}", e),
        }
    }

    info!("Published {}/{} built-in commands", published, total);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // トレーシング初期化
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = BotConfig::from_env().context("failed to load configuration")?;
    info!("Configuration loaded (application {})", config.application_id);

    // プラグインインデックスを読み込み
    let plugins = PluginIndex::load(&config.data_dir).await.unwrap_or_else(|e| {
        error!("Failed to load plugin manifest: {}, continuing without plugins", e);
        PluginIndex::new()
    });

    let registry: SharedCommandRegistry = Arc::new(RwLock::new(CommandRegistry::new()));
    let responder = InteractionResponder::new(
        Arc::new(HttpRestClient::from_config(&config)),
        Arc::new(EmbedFormatter::new(config.embed_color)),
        config.application_id.clone(),
    );
    let deps = CommandDeps::new(registry.clone(), Arc::new(plugins), responder);

    load_builtin_commands(&deps).await;

    let handler = Handler { registry };

    // スラッシュコマンドだけなのでGUILDSのみ
    let mut client = Client::builder(&config.token, GatewayIntents::GUILDS)
        .event_handler(handler)
        .await
        .context("failed to create Discord client")?;

    info!("Starting bot...");
    client.start().await.context("client error")?;

    Ok(())
}
