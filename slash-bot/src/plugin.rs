//! プラグインインデックス
//!
//! コマンド名 -> 宣言元プラグインの対応表。プラグインローダーが
//! `data/plugins.json` に書き出したマニフェストから構築する。
//! コマンドはプラグインを所有せず、ここで引いたIDを持つだけ。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// プラグインインデックスのエラー
#[derive(Debug, Error)]
pub enum PluginIndexError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("JSON parse error: {0}")]
    ParseError(String),
}

/// プラグインID（プラグイン名）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// プラグインが宣言するコマンド一覧
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

/// マニフェストファイルの形式
#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    plugins: Vec<PluginManifest>,
}

/// コマンド名 -> プラグインIDのインデックス
#[derive(Debug, Clone, Default)]
pub struct PluginIndex {
    by_command: HashMap<String, PluginId>,
    plugins: Vec<PluginId>,
}

impl PluginIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_file_path(base_dir: &str) -> PathBuf {
        Path::new(base_dir).join("plugins.json")
    }

    /// マニフェストファイルから読み込み
    ///
    /// ファイルが存在しない場合は空のインデックスを返す
    pub async fn load(base_dir: &str) -> Result<Self, PluginIndexError> {
        let path = Self::get_file_path(base_dir);
        debug!("Loading plugin manifest from {:?}", path);

        if !path.exists() {
            info!("Plugin manifest not found at {:?}, no plugin commands", path);
            return Ok(Self::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| PluginIndexError::IoError(format!("Failed to read file: {}", e)))?;

        let file: ManifestFile = serde_json::from_str(&content)
            .map_err(|e| PluginIndexError::ParseError(format!("Failed to parse JSON: {}", e)))?;

        let mut index = Self::new();
        for manifest in file.plugins {
            index.insert(manifest);
        }

        info!(
            "Loaded {} plugins declaring {} commands",
            index.plugins.len(),
            index.by_command.len()
        );
        Ok(index)
    }

    /// プラグインを追加
    ///
    /// 他のプラグインが既に宣言しているコマンドは先勝ちとし、無視した名前を返す。
    pub fn insert(&mut self, manifest: PluginManifest) -> Vec<String> {
        let id = PluginId::new(manifest.name);
        let mut ignored = Vec::new();

        for command in manifest.commands {
            match self.by_command.get(&command) {
                Some(owner) if owner != &id => {
                    warn!(
                        "Command '{}' declared by both '{}' and '{}', keeping '{}'",
                        command, owner, id, owner
                    );
                    ignored.push(command);
                }
                Some(_) => {}
                None => {
                    self.by_command.insert(command, id.clone());
                }
            }
        }

        if !self.plugins.contains(&id) {
            self.plugins.push(id);
        }
        ignored
    }

    /// コマンドを宣言したプラグインを取得
    pub fn plugin_for(&self, command: &str) -> Option<&PluginId> {
        self.by_command.get(command)
    }

    /// プラグイン一覧（登録順）
    pub fn plugins(&self) -> &[PluginId] {
        &self.plugins
    }

    pub fn command_count(&self) -> usize {
        self.by_command.len()
    }
}
