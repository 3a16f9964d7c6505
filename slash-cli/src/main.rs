//! slash-cli - スラッシュコマンド記述子のCLIツール
//!
//! 記述子ファイルをオフラインで検証したり、Discordに公開・一覧表示する

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value as JsonValue;
use slash_bot::descriptor::CommandSpec;
use slash_bot::registry::CommandRegistry;
use slash_bot::rest::{routes, DiscordRest, HttpRestClient, RestRequest, DEFAULT_API_BASE};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// slash-bot CLI
#[derive(Parser)]
#[command(name = "slash-cli")]
#[command(about = "CLI tool for slash command descriptors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ApiArgs {
    /// Discord application ID
    #[arg(long, env = "DISCORD_APPLICATION_ID")]
    app_id: String,
    /// Bot token
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    token: String,
    /// API base URL
    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate descriptor file (object or array of objects)
    Validate {
        file: PathBuf,
    },
    /// Validate and publish descriptors
    Publish {
        file: PathBuf,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// List commands published for the application
    List {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            validate_file(&file)?;
        }
        Commands::Publish { file, api } => {
            let specs = validate_file(&file)?;
            publish_command(&api, &specs).await?;
        }
        Commands::List { api } => {
            list_command(&api).await?;
        }
    }

    Ok(())
}

fn read_descriptors(path: &Path) -> Result<Vec<JsonValue>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: JsonValue = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(match value {
        JsonValue::Array(items) => items,
        other => vec![other],
    })
}

/// 全記述子を検証し、1つでも不正なら失敗する
fn validate_file(path: &Path) -> Result<Vec<CommandSpec>> {
    let registry = CommandRegistry::new();
    let mut names = HashSet::new();
    let mut specs = Vec::new();
    let mut failures = 0;

    for (i, raw) in read_descriptors(path)?.into_iter().enumerate() {
        let result = CommandSpec::from_value(raw)
            .map_err(anyhow::Error::from)
            .and_then(|spec| {
                registry.check(&spec)?;
                if !names.insert(spec.name.clone()) {
                    bail!("duplicate command name '{}'", spec.name);
                }
                Ok(spec)
            });

        match result {
            Ok(spec) => {
                println!("{} /{}", "✓".green(), spec.name.cyan());
                specs.push(spec);
            }
            Err(e) => {
                println!("{} #{}: {}", "✗".red(), i, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} descriptors are invalid", failures, failures + specs.len());
    }
    Ok(specs)
}

async fn publish_command(api: &ApiArgs, specs: &[CommandSpec]) -> Result<()> {
    let client = HttpRestClient::new(&api.api_base, &api.token);
    let path = routes::application_commands(&api.app_id);
    let mut failures = 0;

    for spec in specs {
        let body = serde_json::to_value(spec.payload())?;
        match client.send(RestRequest::post(path.clone(), body)).await {
            Ok(created) => {
                let id = created["id"].as_str().unwrap_or("?");
                println!("{} Published /{} ({})", "✓".green(), spec.name.cyan(), id.yellow());
            }
            Err(e) => {
                eprintln!("{}: /{}: {}", "Error".red(), spec.name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} commands failed to publish", failures);
    }
    Ok(())
}

async fn list_command(api: &ApiArgs) -> Result<()> {
    let client = HttpRestClient::new(&api.api_base, &api.token);
    let commands = client
        .send(RestRequest::get(routes::application_commands(&api.app_id)))
        .await?;

    let commands = commands.as_array().cloned().unwrap_or_default();
    if commands.is_empty() {
        println!("No commands found.");
        return Ok(());
    }

    println!("{}", "Commands:".green().bold());
    for command in commands {
        println!(
            "  /{} {} ({})",
            command["name"].as_str().unwrap_or("?").cyan(),
            command["description"].as_str().unwrap_or(""),
            command["id"].as_str().unwrap_or("?").dimmed()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_single_object() {
        let file = write_temp(r#"{ "name": "ping", "description": "Pong" }"#);
        let specs = validate_file(file.path()).unwrap();
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn test_validate_array_with_invalid_entry() {
        let file = write_temp(
            r#"[
                { "name": "ping", "description": "Pong" },
                { "name": "x", "description": "too short" },
                42
            ]"#,
        );
        assert!(validate_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_duplicate_names() {
        let file = write_temp(
            r#"[
                { "name": "ping", "description": "Pong" },
                { "name": "ping", "description": "Again" }
            ]"#,
        );
        assert!(validate_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_unparsable_file() {
        let file = write_temp("not json");
        assert!(validate_file(file.path()).is_err());
    }
}
