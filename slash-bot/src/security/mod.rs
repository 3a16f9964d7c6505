//! セキュリティ関連モジュール
//!
//! ログやエラーメッセージに載るトークンのマスキングを提供する。

mod logging;

pub use logging::{mask_discord_token, mask_interaction_token, mask_secrets, SecretMasker};
