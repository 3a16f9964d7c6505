//! 環境変数からのボット設定

use crate::format::DEFAULT_EMBED_COLOR;
use crate::rest::DEFAULT_API_BASE;
use std::env;
use thiserror::Error;

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// ボット設定
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// ボットトークン（`DISCORD_BOT_TOKEN`）
    pub token: String,
    /// アプリケーションID（`DISCORD_APPLICATION_ID`）
    pub application_id: String,
    /// APIベースURL（`DISCORD_API_BASE`）
    pub api_base: String,
    /// Embedのデフォルトカラー（`EMBED_COLOR`、16進 or 10進）
    pub embed_color: u32,
    /// データディレクトリ（`DATA_DIR`、plugins.json の置き場所）
    pub data_dir: String,
}

impl BotConfig {
    /// 環境変数から読み込み
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から読み込み
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let token = required("DISCORD_BOT_TOKEN")?;
        let application_id = required("DISCORD_APPLICATION_ID")?;
        if application_id.parse::<u64>().is_err() {
            return Err(ConfigError::Invalid {
                name: "DISCORD_APPLICATION_ID",
                value: application_id,
            });
        }

        let embed_color = match lookup("EMBED_COLOR") {
            Some(value) => parse_color(&value).ok_or(ConfigError::Invalid {
                name: "EMBED_COLOR",
                value,
            })?,
            None => DEFAULT_EMBED_COLOR,
        };

        Ok(Self {
            token,
            application_id,
            api_base: lookup("DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            embed_color,
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()),
        })
    }
}

/// `0x5865F2` / `#5865F2` / `5793266` 形式のカラーを読む
fn parse_color(value: &str) -> Option<u32> {
    let value = value.trim();
    let color = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix('#')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        value.parse().ok()?
    };
    (color <= 0xFFFFFF).then_some(color)
}
