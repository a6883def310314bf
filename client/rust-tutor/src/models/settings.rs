use serde::{Deserialize, Serialize};

/// AI backend the server should route guidance requests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "openai" => Some(Provider::OpenAi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Partial settings change; `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
}

impl SettingsUpdate {
    pub fn provider(provider: Provider) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }
}

impl Settings {
    pub fn merge(&mut self, update: SettingsUpdate) {
        if let Some(provider) = update.provider {
            self.provider = provider;
        }
        // An empty credential clears the stored one.
        if let Some(api_key) = update.api_key {
            let trimmed = api_key.trim();
            self.api_key = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(Provider::parse("Gemini"), Some(Provider::Gemini));
        assert_eq!(Provider::parse("claude"), None);
    }

    #[test]
    fn blank_key_clears_credential() {
        let mut settings = Settings {
            provider: Provider::OpenAi,
            api_key: Some("sk-old".to_string()),
        };
        settings.merge(SettingsUpdate::api_key("   "));
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.provider, Provider::OpenAi);
    }
}
