//! ログマスキング機能
//!
//! ボットトークンやインタラクショントークンがログ・エラーに漏れないようにする。
//! インタラクショントークンはURLパスに埋め込まれるため、パスも対象にする。

use regex::Regex;
use std::sync::OnceLock;

/// Discordボットトークンのパターンマッチ用正規表現
static DISCORD_TOKEN_PATTERN: OnceLock<Regex> = OnceLock::new();
/// インタラクション/Webhookパスのパターンマッチ用正規表現
static INTERACTION_PATH_PATTERN: OnceLock<Regex> = OnceLock::new();
/// Authorizationヘッダのパターンマッチ用正規表現
static AUTH_HEADER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn discord_token_regex() -> &'static Regex {
    DISCORD_TOKEN_PATTERN.get_or_init(|| {
        Regex::new(r"[MNO][A-Za-z\d_-]{23,25}\.[\w-]{6}\.[\w-]{27,38}")
            .expect("Invalid Discord token regex")
    })
}

fn interaction_path_regex() -> &'static Regex {
    INTERACTION_PATH_PATTERN.get_or_init(|| {
        // /interactions/{id}/{token} と /webhooks/{app_id}/{token}
        Regex::new(r"/(interactions|webhooks)/(\d+)/[^/\s]+")
            .expect("Invalid interaction path regex")
    })
}

fn auth_header_regex() -> &'static Regex {
    AUTH_HEADER_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(bot|bearer)\s+[^\s,;]{8,}").expect("Invalid auth header regex")
    })
}

/// Discordボットトークンをマスキングする
pub fn mask_discord_token(text: &str) -> String {
    discord_token_regex()
        .replace_all(text, "***DISCORD_TOKEN_MASKED***")
        .to_string()
}

/// URLパス中のインタラクショントークンをマスキングする
///
/// # Example
/// ```
/// use slash_bot::security::mask_interaction_token;
/// let masked = mask_interaction_token("/interactions/123/aW50ZXJhY3Rpb24/callback");
/// assert_eq!(masked, "/interactions/123/***/callback");
/// ```
pub fn mask_interaction_token(text: &str) -> String {
    interaction_path_regex()
        .replace_all(text, "/$1/$2/***")
        .to_string()
}

/// 機密情報を一括でマスキングする
pub fn mask_secrets(text: &str) -> String {
    let result = mask_discord_token(text);
    let result = mask_interaction_token(&result);

    auth_header_regex()
        .replace_all(&result, "$1 ***MASKED***")
        .to_string()
}

/// 機密情報マスカー
///
/// `tracing` のフィールドにそのまま渡せるDisplay実装。
pub struct SecretMasker<'a> {
    text: &'a str,
}

impl<'a> SecretMasker<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    pub fn mask(&self) -> String {
        mask_secrets(self.text)
    }
}

impl<'a> std::fmt::Display for SecretMasker<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mask())
    }
}
