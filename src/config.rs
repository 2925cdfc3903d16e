//! Engine configuration
//!
//! Plain defaults with environment overrides. The binary calls
//! `dotenvy::dotenv().ok()` before `EngineConfig::from_env()`; library users
//! construct the struct directly.

use chrono::Duration;

/// Tunables for the conversation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Inactivity window after which an edit session is considered expired.
    pub session_timeout: Duration,

    /// Interval of the periodic expiry sweep.
    pub sweep_interval: std::time::Duration,

    /// Maximum accepted classification-name length, in characters.
    pub max_name_chars: usize,

    /// Glyph inputs longer than this fall back to the default glyph.
    pub max_glyph_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::minutes(30),
            sweep_interval: std::time::Duration::from_secs(300),
            max_name_chars: 50,
            max_glyph_chars: 5,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SPENDBOT_*` environment variables. Unset or
    /// unparsable values silently keep their default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(minutes) = env_parse::<i64>("SPENDBOT_SESSION_TIMEOUT_MINUTES") {
            config.session_timeout = Duration::minutes(minutes);
        }
        if let Some(secs) = env_parse::<u64>("SPENDBOT_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = std::time::Duration::from_secs(secs);
        }
        if let Some(chars) = env_parse::<usize>("SPENDBOT_MAX_NAME_CHARS") {
            config.max_name_chars = chars;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
