use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Model providers reachable through an OpenAI-compatible API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// The official `OpenAI` API.
    #[serde(alias = "OpenAI")]
    OpenAi,
    /// `DeepSeek`.
    #[default]
    DeepSeek,
    /// Any other compatible endpoint, configured only through the generic
    /// `LLM_*` variables.
    Custom,
}

impl Provider {
    /// Lower-case provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Custom => "custom",
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::DeepSeek => "deepseek-reasoner",
            Self::Custom => "deepseek-chat",
        }
    }

    /// Base URL used when none is configured.
    #[must_use]
    pub const fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::DeepSeek => Some("https://api.deepseek.com"),
            Self::Custom => None,
        }
    }

    /// Provider-specific `(api key, base url)` environment variables.
    #[must_use]
    pub const fn env_vars(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::OpenAi => Some(("OPENAI_API_KEY", "OPENAI_BASE_URL")),
            Self::DeepSeek => Some(("DEEPSEEK_API_KEY", "DEEPSEEK_BASE_URL")),
            Self::Custom => None,
        }
    }

    /// Resolves the API key and base URL.
    ///
    /// Each value is taken from the first non-empty source among: the
    /// explicit value, the provider-specific variable, the generic `LLM_*`
    /// variable, and finally (base URL only) the provider default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when either value is still
    /// missing.
    pub fn resolve_credentials<F>(
        self,
        api_key: Option<&str>,
        base_url: Option<&str>,
        lookup: F,
    ) -> ConfigResult<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let explicit = |value: Option<&str>| {
            value
                .filter(|value| !value.trim().is_empty())
                .map(str::to_owned)
        };
        let (key_var, url_var) = match self.env_vars() {
            Some((key, url)) => (Some(key), Some(url)),
            None => (None, None),
        };

        let api_key = explicit(api_key)
            .or_else(|| key_var.and_then(lookup))
            .or_else(|| lookup("LLM_API_KEY"))
            .ok_or(ConfigError::MissingCredential {
                provider: self.as_str().to_owned(),
                field: "api key",
            })?;
        let base_url = explicit(base_url)
            .or_else(|| url_var.and_then(lookup))
            .or_else(|| lookup("LLM_BASE_URL"))
            .or_else(|| self.default_base_url().map(str::to_owned))
            .ok_or(ConfigError::MissingCredential {
                provider: self.as_str().to_owned(),
                field: "base url",
            })?;

        Ok(Credentials { api_key, base_url })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "custom" => Ok(Self::Custom),
            _ => Err(ConfigError::UnknownProvider(value.to_owned())),
        }
    }
}

/// API key and base URL resolved for one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token.
    pub api_key: String,
    /// Base URL of the chat-completions API.
    pub base_url: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("DeepSeek".parse::<Provider>().unwrap(), Provider::DeepSeek);
        assert_eq!(" openai ".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!(matches!(
            "anthropic".parse::<Provider>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn explicit_values_win() {
        let creds = Provider::OpenAi
            .resolve_credentials(
                Some("sk-explicit"),
                Some("http://localhost:8080/v1"),
                env(&[("OPENAI_API_KEY", "sk-env")]),
            )
            .unwrap();
        assert_eq!(creds.api_key, "sk-explicit");
        assert_eq!(creds.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn provider_variables_precede_generic_ones() {
        let creds = Provider::DeepSeek
            .resolve_credentials(
                None,
                None,
                env(&[("DEEPSEEK_API_KEY", "sk-ds"), ("LLM_API_KEY", "sk-llm")]),
            )
            .unwrap();
        assert_eq!(creds.api_key, "sk-ds");
        assert_eq!(creds.base_url, "https://api.deepseek.com");
    }

    #[test]
    fn custom_provider_needs_generic_base_url() {
        let err = Provider::Custom
            .resolve_credentials(Some("sk"), Some(""), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { field: "base url", .. }));

        let creds = Provider::Custom
            .resolve_credentials(
                None,
                None,
                env(&[("LLM_API_KEY", "k"), ("LLM_BASE_URL", "http://x")]),
            )
            .unwrap();
        assert_eq!(creds.base_url, "http://x");
    }

    #[test]
    fn missing_key_is_reported() {
        let err = Provider::OpenAi
            .resolve_credentials(None, None, env(&[]))
            .unwrap_err();
        assert_eq!(err.to_string(), "no api key configured for provider `openai`");
    }

    #[test]
    fn credentials_debug_hides_key() {
        let creds = Credentials {
            api_key: "sk-secret".into(),
            base_url: "https://api.deepseek.com".into(),
        };
        assert!(!format!("{creds:?}").contains("sk-secret"));
    }
}
