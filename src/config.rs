//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `COHORT_DB_PATH` and `COHORT_LOG_LEVEL` env overrides.

use std::{env, fs, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::error::AppError;

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the PTY channel is explicitly enabled.
    pub enabled: bool,
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Whether the Telegram channel is explicitly enabled.
    pub enabled: bool,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub telegram: TelegramConfig,
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite database file path.
    pub db_path: PathBuf,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub storage: StorageConfig,
    pub comms: CommsConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the Telegram channel should be loaded.
    pub fn comms_telegram_should_load(&self) -> bool {
        self.comms.telegram.enabled
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    storage: RawStorage,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawStorage {
    #[serde(default = "default_db_path")]
    db_path: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    telegram: RawTelegram,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `true`: PTY auto-enables when no other channel is present.
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawTelegram {
    /// Defaults to `false`: Telegram must be explicitly enabled.
    #[serde(default = "default_false")]
    enabled: bool,
}

impl Default for RawStorage {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self { enabled: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_path() -> String {
    "data/cohort.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let db_path_override = env::var("COHORT_DB_PATH").ok();
    let log_level_override = env::var("COHORT_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        db_path_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("malformed {}: {e}", path.display())))?;

    let db_path = db_path_override
        .map(str::to_string)
        .unwrap_or(parsed.storage.db_path);
    let log_level = log_level_override
        .map(str::to_string)
        .unwrap_or(parsed.bot.log_level);

    if parsed.bot.name.trim().is_empty() {
        return Err(AppError::Config("bot.name must not be empty".into()));
    }

    Ok(Config {
        bot_name: parsed.bot.name,
        log_level,
        storage: StorageConfig { db_path: PathBuf::from(db_path) },
        comms: CommsConfig {
            pty: PtyConfig { enabled: parsed.comms.pty.enabled },
            telegram: TelegramConfig { enabled: parsed.comms.telegram.enabled },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_resolves_defaults() {
        let f = write_toml("[bot]\nname = \"cohort-bot\"\n");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.bot_name, "cohort-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/cohort.db"));
        assert!(cfg.comms_pty_should_load());
        assert!(!cfg.comms_telegram_should_load());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let f = write_toml(
            "[bot]\nname = \"cohort-bot\"\nlog_level = \"warn\"\n\n[storage]\ndb_path = \"a.db\"\n",
        );
        let cfg = load_from(f.path(), Some("/tmp/b.db"), Some("debug")).unwrap();
        assert_eq!(cfg.storage.db_path, PathBuf::from("/tmp/b.db"));
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn channel_flags_parse() {
        let f = write_toml(
            "[bot]\nname = \"x\"\n\n[comms.pty]\nenabled = false\n\n[comms.telegram]\nenabled = true\n",
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(!cfg.comms_pty_should_load());
        assert!(cfg.comms_telegram_should_load());
    }

    #[test]
    fn empty_bot_name_rejected() {
        let f = write_toml("[bot]\nname = \"  \"\n");
        assert!(load_from(f.path(), None, None).is_err());
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_from(Path::new("/nonexistent/cfg.toml"), None, None).is_err());
    }
}
