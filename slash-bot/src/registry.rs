//! コマンドレジストリ
//!
//! 記述子のスキーマ検証と、名前をキーにした登録・検索を行う。

use crate::command::CommandDescriptor;
use crate::descriptor::{CommandOption, CommandSpec, OptionChoice};
use once_cell::sync::Lazy;
use regex::Regex;
use serenity::model::application::CommandOptionType;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// コマンド名の長さ（文字数）
pub const COMMAND_NAME_LEN: (usize, usize) = (3, 32);
/// オプション名の長さ（文字数）
pub const OPTION_NAME_LEN: (usize, usize) = (1, 32);
/// 説明文の長さ（文字数）
pub const DESCRIPTION_LEN: (usize, usize) = (1, 100);
/// 1階層あたりのオプション数上限
pub const MAX_OPTIONS: usize = 10;
/// 選択肢の上限
pub const MAX_CHOICES: usize = 25;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-_\p{L}\p{N}]+$").expect("Invalid command name regex"));

/// レジストリのエラー
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(
        "Invalid command name '{0}': must be {min}-{max} lowercase letters, digits, '-' or '_'",
        min = COMMAND_NAME_LEN.0,
        max = COMMAND_NAME_LEN.1
    )]
    InvalidName(String),

    #[error(
        "Invalid description for '{0}': must be {min}-{max} characters",
        min = DESCRIPTION_LEN.0,
        max = DESCRIPTION_LEN.1
    )]
    InvalidDescription(String),

    #[error("Command '{name}' has {count} options (max {max})", max = MAX_OPTIONS)]
    TooManyOptions { name: String, count: usize },

    #[error("Invalid option in '{command}': {reason}")]
    InvalidOption { command: String, reason: String },

    #[error("Command already registered: {0}")]
    AlreadyRegistered(String),
}

/// コマンドレジストリ
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// 記述子のスキーマを検証
    pub fn check(&self, spec: &CommandSpec) -> Result<(), RegistryError> {
        if !is_valid_name(&spec.name, COMMAND_NAME_LEN) {
            return Err(RegistryError::InvalidName(spec.name.clone()));
        }
        if !within(&spec.description, DESCRIPTION_LEN) {
            return Err(RegistryError::InvalidDescription(spec.name.clone()));
        }
        if spec.options.len() > MAX_OPTIONS {
            return Err(RegistryError::TooManyOptions {
                name: spec.name.clone(),
                count: spec.options.len(),
            });
        }

        check_options(&spec.name, &spec.options, Level::Top)?;
        debug!("Descriptor '{}' passed validation", spec.name);
        Ok(())
    }

    /// コマンドを登録
    ///
    /// 同名のコマンドが既にある場合は `AlreadyRegistered` を返し、既存の登録は変更しない。
    pub fn register(&mut self, descriptor: Arc<CommandDescriptor>) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        if self.contains(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }

        info!("Registering command: {}", name);
        self.commands.insert(name, descriptor);
        Ok(())
    }

    /// コマンドを取得
    pub fn get(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// 登録済みコマンド名一覧（名前順）
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// 登録済みの記述子（名前順）
    pub fn descriptors(&self) -> Vec<Arc<CommandDescriptor>> {
        let mut descriptors: Vec<_> = self.commands.values().cloned().collect();
        descriptors.sort_by(|a, b| a.name().cmp(b.name()));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 共有状態で使用するCommandRegistry
pub type SharedCommandRegistry = Arc<RwLock<CommandRegistry>>;

/// オプションの入れ子位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Top,
    InGroup,
    InSubCommand,
}

fn within(value: &str, (min, max): (usize, usize)) -> bool {
    let len = value.chars().count();
    len >= min && len <= max
}

fn is_valid_name(name: &str, bounds: (usize, usize)) -> bool {
    within(name, bounds) && NAME_PATTERN.is_match(name) && name.to_lowercase() == name
}

fn check_options(
    command: &str,
    options: &[CommandOption],
    level: Level,
) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidOption {
        command: command.to_string(),
        reason,
    };

    if options.len() > MAX_OPTIONS {
        return Err(invalid(format!(
            "{} options at one level (max {})",
            options.len(),
            MAX_OPTIONS
        )));
    }

    // サブコマンドと通常オプションは同じ階層に混在できない
    let subcommands = options.iter().filter(|o| o.is_subcommand()).count();
    if subcommands > 0 && subcommands < options.len() {
        return Err(invalid("subcommands cannot be mixed with plain options".to_string()));
    }

    let mut seen = HashSet::new();
    let mut optional_seen = false;

    for option in options {
        if !is_valid_name(&option.name, OPTION_NAME_LEN) {
            return Err(invalid(format!("bad option name '{}'", option.name)));
        }
        if !within(&option.description, DESCRIPTION_LEN) {
            return Err(invalid(format!("bad description for option '{}'", option.name)));
        }
        if !seen.insert(option.name.as_str()) {
            return Err(invalid(format!("duplicate option name '{}'", option.name)));
        }

        match option.kind {
            CommandOptionType::SubCommandGroup => {
                if level != Level::Top {
                    return Err(invalid(format!("group '{}' must be top-level", option.name)));
                }
                let children = option.sub_options();
                if children.iter().any(|c| c.kind != CommandOptionType::SubCommand) {
                    return Err(invalid(format!(
                        "group '{}' may only contain subcommands",
                        option.name
                    )));
                }
                check_options(command, children, Level::InGroup)?;
            }
            CommandOptionType::SubCommand => {
                if level == Level::InSubCommand {
                    return Err(invalid(format!("subcommand '{}' nested too deeply", option.name)));
                }
                check_options(command, option.sub_options(), Level::InSubCommand)?;
            }
            CommandOptionType::Unknown(code) => {
                return Err(invalid(format!("unknown option type {} for '{}'", code, option.name)));
            }
            kind => {
                if option.options.is_some() {
                    return Err(invalid(format!(
                        "option '{}' cannot have sub-options",
                        option.name
                    )));
                }
                if option.is_required() && optional_seen {
                    return Err(invalid(format!(
                        "required option '{}' must come before optional ones",
                        option.name
                    )));
                }
                optional_seen |= !option.is_required();

                if let Some(choices) = &option.choices {
                    check_choices(kind, choices).map_err(|reason| {
                        invalid(format!("option '{}': {}", option.name, reason))
                    })?;
                }
            }
        }

        if option.is_subcommand() && option.choices.is_some() {
            return Err(invalid(format!("subcommand '{}' cannot have choices", option.name)));
        }
    }

    Ok(())
}

fn check_choices(kind: CommandOptionType, choices: &[OptionChoice]) -> Result<(), String> {
    if choices.len() > MAX_CHOICES {
        return Err(format!("{} choices (max {})", choices.len(), MAX_CHOICES));
    }

    for choice in choices {
        if !within(&choice.name, (1, 100)) {
            return Err(format!("bad choice name '{}'", choice.name));
        }
        let matches = match kind {
            CommandOptionType::String => choice.value.is_string(),
            CommandOptionType::Integer => choice.value.is_i64() || choice.value.is_u64(),
            CommandOptionType::Number => choice.value.is_number(),
            _ => {
                return Err(
                    "choices are only allowed on string, integer and number options".to_string(),
                )
            }
        };
        if !matches {
            return Err(format!("choice '{}' has a value of the wrong type", choice.name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::noop_descriptor;
    use serde_json::json;

    fn spec(raw: serde_json::Value) -> CommandSpec {
        CommandSpec::from_value(raw).unwrap()
    }

    #[test]
    fn test_check_accepts_minimal_descriptor() {
        let registry = CommandRegistry::new();
        let spec = spec(json!({ "name": "ping", "description": "Check latency" }));
        assert!(registry.check(&spec).is_ok());
    }

    #[test]
    fn test_check_name_bounds() {
        let registry = CommandRegistry::new();
        let too_long = "x".repeat(33);
        let longest = "x".repeat(32);

        for bad in ["ab", "UPPER", "has space", too_long.as_str()] {
            let spec = spec(json!({ "name": bad, "description": "d" }));
            assert!(
                matches!(registry.check(&spec), Err(RegistryError::InvalidName(_))),
                "name {:?} should be rejected",
                bad
            );
        }

        for good in ["abc", "set-level", "snake_case", "日本語コマンド", longest.as_str()] {
            let spec = spec(json!({ "name": good, "description": "d" }));
            assert!(registry.check(&spec).is_ok(), "name {:?} should pass", good);
        }
    }

    #[test]
    fn test_check_description_bounds() {
        let registry = CommandRegistry::new();

        let empty = spec(json!({ "name": "ping", "description": "" }));
        assert!(matches!(registry.check(&empty), Err(RegistryError::InvalidDescription(_))));

        let long = spec(json!({ "name": "ping", "description": "d".repeat(101) }));
        assert!(matches!(registry.check(&long), Err(RegistryError::InvalidDescription(_))));

        let max = spec(json!({ "name": "ping", "description": "d".repeat(100) }));
        assert!(registry.check(&max).is_ok());
    }

    #[test]
    fn test_check_too_many_options() {
        let registry = CommandRegistry::new();
        let options: Vec<_> = (0..11)
            .map(|i| json!({ "type": 3, "name": format!("opt{}", i), "description": "d" }))
            .collect();
        let spec = spec(json!({ "name": "many", "description": "d", "options": options }));

        assert!(matches!(
            registry.check(&spec),
            Err(RegistryError::TooManyOptions { count: 11, .. })
        ));
    }

    #[test]
    fn test_check_required_before_optional() {
        let registry = CommandRegistry::new();
        let spec = spec(json!({
            "name": "remind",
            "description": "d",
            "options": [
                { "type": 3, "name": "note", "description": "d" },
                { "type": 4, "name": "minutes", "description": "d", "required": true }
            ]
        }));

        assert!(matches!(registry.check(&spec), Err(RegistryError::InvalidOption { .. })));
    }

    #[test]
    fn test_check_duplicate_option_names() {
        let registry = CommandRegistry::new();
        let spec = spec(json!({
            "name": "dupe",
            "description": "d",
            "options": [
                { "type": 3, "name": "value", "description": "d" },
                { "type": 3, "name": "value", "description": "d" }
            ]
        }));

        assert!(registry.check(&spec).is_err());
    }

    #[test]
    fn test_check_choice_types() {
        let registry = CommandRegistry::new();

        let wrong = spec(json!({
            "name": "level",
            "description": "d",
            "options": [{
                "type": 4, "name": "amount", "description": "d",
                "choices": [{ "name": "one", "value": "1" }]
            }]
        }));
        assert!(registry.check(&wrong).is_err());

        let ok = spec(json!({
            "name": "level",
            "description": "d",
            "options": [{
                "type": 4, "name": "amount", "description": "d",
                "choices": [{ "name": "one", "value": 1 }]
            }]
        }));
        assert!(registry.check(&ok).is_ok());

        let on_bool = spec(json!({
            "name": "level",
            "description": "d",
            "options": [{
                "type": 5, "name": "flag", "description": "d",
                "choices": [{ "name": "yes", "value": true }]
            }]
        }));
        assert!(registry.check(&on_bool).is_err());
    }

    #[test]
    fn test_check_subcommand_nesting() {
        let registry = CommandRegistry::new();

        let ok = spec(json!({
            "name": "settings",
            "description": "d",
            "options": [{
                "type": 2, "name": "guild", "description": "d",
                "options": [{
                    "type": 1, "name": "set", "description": "d",
                    "options": [{ "type": 3, "name": "key", "description": "d", "required": true }]
                }]
            }]
        }));
        assert!(registry.check(&ok).is_ok());

        let group_in_sub = spec(json!({
            "name": "settings",
            "description": "d",
            "options": [{
                "type": 1, "name": "set", "description": "d",
                "options": [{ "type": 2, "name": "inner", "description": "d" }]
            }]
        }));
        assert!(registry.check(&group_in_sub).is_err());

        let mixed = spec(json!({
            "name": "settings",
            "description": "d",
            "options": [
                { "type": 1, "name": "show", "description": "d" },
                { "type": 3, "name": "key", "description": "d" }
            ]
        }));
        assert!(registry.check(&mixed).is_err());
    }

    #[test]
    fn test_check_unknown_option_type() {
        let registry = CommandRegistry::new();
        let spec = spec(json!({
            "name": "weird",
            "description": "d",
            "options": [{ "type": 99, "name": "x", "description": "d" }]
        }));
        assert!(registry.check(&spec).is_err());
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let mut registry = CommandRegistry::new();
        registry.register(noop_descriptor("ping")).unwrap();

        assert!(registry.contains("ping"));
        assert_eq!(registry.get("ping").unwrap().name(), "ping");
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_keeps_first() {
        let mut registry = CommandRegistry::new();
        let first = noop_descriptor("ping");
        registry.register(first.clone()).unwrap();

        let result = registry.register(noop_descriptor("ping"));
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(ref n)) if n == "ping"));
        assert!(Arc::ptr_eq(&registry.get("ping").unwrap(), &first));
    }

    #[tokio::test]
    async fn test_list_commands_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register(noop_descriptor("zeta")).unwrap();
        registry.register(noop_descriptor("alpha")).unwrap();

        assert_eq!(registry.list_commands(), vec!["alpha", "zeta"]);
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
