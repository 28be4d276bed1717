use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::system::process::ProcessDataFlags;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub default_format: String,
    pub memory: bool,
    pub command_line: bool,
    pub owner: bool,
    pub command_width: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            default_format: "table".to_string(),
            memory: true,
            command_line: false,
            owner: false,
            command_width: 60,
        }
    }
}

impl GeneralConfig {
    pub fn default_flags(&self) -> ProcessDataFlags {
        let mut flags = ProcessDataFlags::NONE;
        if self.memory {
            flags |= ProcessDataFlags::MEMORY;
        }
        if self.command_line {
            flags |= ProcessDataFlags::COMMAND_LINE;
        }
        if self.owner {
            flags |= ProcessDataFlags::OWNER;
        }
        flags
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("proctree").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.general.default_format, "table");
        assert!(config.general.memory);
        assert!(!config.general.command_line);
        assert!(!config.general.owner);
        assert_eq!(config.general.command_width, 60);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn default_flags_follow_general_section() {
        let config = Config::default();
        assert_eq!(config.general.default_flags(), ProcessDataFlags::MEMORY);

        let general = GeneralConfig {
            memory: false,
            command_line: true,
            owner: true,
            ..GeneralConfig::default()
        };
        assert_eq!(
            general.default_flags(),
            ProcessDataFlags::COMMAND_LINE | ProcessDataFlags::OWNER
        );
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[general]
owner = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.general.owner);
        // Other fields should be defaults
        assert!(config.general.memory);
        assert_eq!(config.general.default_format, "table");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[general]
default_format = "json"
memory = false
command_line = true
owner = true
command_width = 120

[logging]
level = "debug"
format = "json"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_format, "json");
        assert!(!config.general.memory);
        assert!(config.general.command_line);
        assert!(config.general.owner);
        assert_eq!(config.general.command_width, 120);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.general.default_format, "table");
    }

    #[test]
    fn invalid_toml_returns_default() {
        let temp = std::env::temp_dir().join("proctree_test_invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.general.default_format, "table");
        let _ = std::fs::remove_file(&temp);
    }
}
