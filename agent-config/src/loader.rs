use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::AgentConfig;

/// Profile (top-level TOML table) read when none is named.
pub const DEFAULT_PROFILE: &str = "deepseek";

impl AgentConfig {
    /// Builds a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or
    /// [`ConfigError::UnknownProvider`] for unparsable variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from the supplied variable lookup.
    ///
    /// Reads `LLM_MODEL_ID`, `LLM_PROVIDER`, `LLM_API_KEY`, `LLM_BASE_URL`,
    /// `LLM_TIMEOUT`, `DEBUG`, `LOG_LEVEL`, `TEMPERATURE`, `MAX_TOKENS`,
    /// `MAX_ITERATIONS` and `MAX_HISTORY_LENGTH`. Unset or empty variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or
    /// [`ConfigError::UnknownProvider`] for unparsable variables.
    pub fn from_env_with<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(model) = var("LLM_MODEL_ID") {
            config.model = model;
        }
        if let Some(provider) = var("LLM_PROVIDER") {
            config.provider = provider.parse()?;
        }
        config.api_key = var("LLM_API_KEY");
        config.base_url = var("LLM_BASE_URL");
        if let Some(debug) = var("DEBUG") {
            config.debug = debug.trim().eq_ignore_ascii_case("true");
        }
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(value) = var("TEMPERATURE") {
            config.temperature = parse_var("TEMPERATURE", &value)?;
        }
        if let Some(value) = var("MAX_TOKENS") {
            config.max_tokens = Some(parse_var("MAX_TOKENS", &value)?);
        }
        if let Some(value) = var("LLM_TIMEOUT") {
            config.timeout_secs = parse_var("LLM_TIMEOUT", &value)?;
        }
        if let Some(value) = var("MAX_ITERATIONS") {
            config.max_iterations = parse_var("MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = var("MAX_HISTORY_LENGTH") {
            config.max_history_length = parse_var("MAX_HISTORY_LENGTH", &value)?;
        }

        Ok(config)
    }

    /// Reads the `profile` table of a TOML document.
    ///
    /// A missing or empty table falls back to [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and the
    /// [`from_env`](Self::from_env) errors on fallback.
    pub fn from_toml_str(text: &str, profile: &str) -> ConfigResult<Self> {
        Self::from_toml_str_with(text, profile, |key| std::env::var(key).ok())
    }

    /// Like [`from_toml_str`](Self::from_toml_str) with an explicit
    /// variable lookup for the fallback.
    ///
    /// # Errors
    ///
    /// See [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_str_with<F>(text: &str, profile: &str, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut document = text.parse::<toml::Table>()?;
        match document.remove(profile) {
            Some(toml::Value::Table(table)) if !table.is_empty() => {
                debug!(profile, "loading configuration profile");
                Ok(toml::Value::Table(table).try_into()?)
            }
            Some(toml::Value::Table(_)) | None => {
                debug!(profile, "profile missing; reading configuration from environment");
                Self::from_env_with(lookup)
            }
            Some(other) => Err(ConfigError::invalid(
                profile,
                other.type_str(),
                "profile must be a table",
            )),
        }
    }

    /// Reads the `profile` table of a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, plus the
    /// [`from_toml_str`](Self::from_toml_str) errors.
    pub fn from_toml_file(path: impl AsRef<Path>, profile: &str) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, profile)
    }
}

fn parse_var<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| ConfigError::invalid(key, value, err))
}
