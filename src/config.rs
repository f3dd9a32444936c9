use crate::storage::Storage;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_duration_mins: u64,
    /// Sessions shorter than this are not recorded.
    pub min_session_secs: u64,
    pub reminder_lead_mins: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_duration_mins: 25,
            min_session_secs: 60,
            reminder_lead_mins: 15,
        }
    }
}

pub fn load_config() -> Result<Config> {
    let path = Storage::get_base_dir()?.join("config.json");
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        let data = serde_json::to_string_pretty(&config)?;
        fs::write(path, data)?;
        return Ok(config);
    }

    let data = fs::read_to_string(path)?;
    let config = serde_json::from_str(&data)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_written_with_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");

        let config = load_config_from(&path)?;
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(load_config_from(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_config_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "min_session_secs": 1 }"#)?;

        let config = load_config_from(&path)?;
        assert_eq!(config.min_session_secs, 1);
        assert_eq!(config.default_duration_mins, 25);
        Ok(())
    }
}
