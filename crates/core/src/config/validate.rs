use super::{types::Config, ConfigError};

/// Validate configuration beyond what deserialization enforces
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.catalog.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.base_url must not be empty".to_string(),
        ));
    }

    if !config.catalog.base_url.starts_with("http://")
        && !config.catalog.base_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "catalog.base_url must be an http(s) URL, got '{}'",
            config.catalog.base_url
        )));
    }

    if config.catalog.token.is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.token must not be empty".to_string(),
        ));
    }

    if let Some(trakt) = &config.trakt {
        if trakt.client_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "trakt.client_id must not be empty".to_string(),
            ));
        }
    }

    if let Some(tmdb) = &config.tmdb {
        if tmdb.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "tmdb.api_key must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::load_config_from_str;
    use super::*;

    fn base_config() -> Config {
        load_config_from_str(
            r#"
catalog:
  base_url: http://localhost:32400
  token: abc
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = base_config();
        config.catalog.base_url = "localhost:32400".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_empty_token() {
        let mut config = base_config();
        config.catalog.token = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_tmdb_key() {
        let config = load_config_from_str(
            r#"
catalog:
  base_url: http://localhost:32400
  token: abc
tmdb:
  api_key: ""
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }
}
