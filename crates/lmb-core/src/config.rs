use std::{env, fs, path::Path, time::Duration};

use crate::{
    domain::ChatReference, errors::Error, relay::RelaySettings, scan::DEFAULT_BATCH_SIZE, Result,
};

/// Telegram's caption limit for media messages.
pub const DEFAULT_CAPTION_LIMIT: usize = 1024;

/// Chats for one target known before any operator command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetPreset {
    pub number: u8,
    pub chat: Option<ChatReference>,
    pub destination: Option<ChatReference>,
}

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    /// The single operator allowed to drive the bot.
    pub owner_id: i64,
    /// Chat used to read messages by id (forward, inspect, delete).
    pub peek_chat_id: i64,

    // Relay behavior
    pub send_delay: Duration,
    pub scan_batch_size: usize,
    pub caption_limit: usize,
    pub max_targets: u8,

    // Optional presets
    pub source_preset: Option<ChatReference>,
    pub target_presets: Vec<TargetPreset>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `load()` uses the process environment.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).and_then(non_empty);

        // Required
        let telegram_bot_token = var("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let owner_id = var("OWNER_ID")
            .ok_or_else(|| Error::Config("OWNER_ID environment variable is required".to_string()))?;
        let owner_id = owner_id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("OWNER_ID must be numeric, got {owner_id:?}")))?;

        let peek_chat_id = match var("PEEK_CHAT_ID") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::Config(format!("PEEK_CHAT_ID must be numeric, got {v:?}")))?,
            None => owner_id,
        };

        // Relay behavior
        let delay_secs = parse_or(var("DELAY_SECONDS"), "DELAY_SECONDS", 0.4f64)?;
        if !delay_secs.is_finite() || delay_secs < 0.0 {
            return Err(Error::Config(format!(
                "DELAY_SECONDS must be a non-negative number, got {delay_secs}"
            )));
        }
        let send_delay = Duration::from_secs_f64(delay_secs);

        let scan_batch_size = parse_or(var("SCAN_BATCH_SIZE"), "SCAN_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if scan_batch_size == 0 {
            return Err(Error::Config("SCAN_BATCH_SIZE must be at least 1".to_string()));
        }

        let caption_limit = parse_or(var("CAPTION_LIMIT"), "CAPTION_LIMIT", DEFAULT_CAPTION_LIMIT)?;
        if caption_limit < 64 {
            return Err(Error::Config(format!(
                "CAPTION_LIMIT is too small to hold a link: {caption_limit}"
            )));
        }

        let max_targets = parse_or(var("MAX_TARGETS"), "MAX_TARGETS", 2u8)?;
        if max_targets == 0 {
            return Err(Error::Config("MAX_TARGETS must be at least 1".to_string()));
        }

        // Presets
        let source_preset = var("SOURCE_CHAT").map(|s| ChatReference::parse(&s));
        let target_presets = (1..=max_targets)
            .filter_map(|n| {
                let chat = var(&format!("TARGET{n}_CHAT")).map(|s| ChatReference::parse(&s));
                let destination =
                    var(&format!("TARGET{n}_DEST")).map(|s| ChatReference::parse(&s));
                if chat.is_none() && destination.is_none() {
                    return None;
                }
                Some(TargetPreset {
                    number: n,
                    chat,
                    destination,
                })
            })
            .collect();

        Ok(Self {
            telegram_bot_token,
            owner_id,
            peek_chat_id,
            send_delay,
            scan_batch_size,
            caption_limit,
            max_targets,
            source_preset,
            target_presets,
        })
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            send_delay: self.send_delay,
            batch_size: self.scan_batch_size,
            caption_limit: self.caption_limit,
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {v:?}"))),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
