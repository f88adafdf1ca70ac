use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub collection: Option<CollectionConfig>,
    /// Source display name -> destination display name, applied to the
    /// assigned-to field during migration.
    #[serde(default)]
    pub users: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionConfig {
    pub base_uri: String,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".caseport")
        .join("config.toml")
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".caseport")
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).with_context(|| "Failed to parse config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            r#"
[collection]
base_uri = "https://tracker.example.com/DefaultCollection"

[users]
"James Schaffer" = "Schaffer, James"
"A. Coder" = "Coder, A."
"#,
        )
        .unwrap();

        assert_eq!(
            config.collection.unwrap().base_uri,
            "https://tracker.example.com/DefaultCollection"
        );
        assert_eq!(
            config.users.get("James Schaffer").map(String::as_str),
            Some("Schaffer, James")
        );
        assert_eq!(config.users.len(), 2);
    }

    #[test]
    fn parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.collection.is_none());
        assert!(config.users.is_empty());
    }

    #[test]
    fn parse_invalid_config_fails() {
        assert!(parse_config("users = 3").is_err());
    }
}
