use crate::config::types::{Config, ExtractConfig, FetchConfig, ForumConfig};
use crate::url::normalize_host;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_forum_config(&config.forum)?;
    validate_fetch_config(&config.fetch)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

fn validate_forum_config(config: &ForumConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    normalize_host(&config.host).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if let Some(proxy) = &config.proxy_url {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy_url '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::Validation(format!(
                "proxy_url '{}' has unsupported scheme '{}'",
                proxy,
                url.scheme()
            )));
        }
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    let count = config.smiley_substitute.chars().count();
    if count != 1 {
        return Err(ConfigError::Validation(format!(
            "smiley_substitute must be exactly one character, got {:?}",
            config.smiley_substitute
        )));
    }
    Ok(())
}
