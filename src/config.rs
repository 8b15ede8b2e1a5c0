use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config directory")]
    NoConfigDir,

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Unknown alias: {0}")]
    UnknownAlias(String),
}

/// A named shortcut for a service/path/interface triple.
///
/// Aliases save retyping the three coordinates of an object on every
/// invocation; `dynbus call @shell ...` expands through this table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Well-known bus name, e.g. "org.gnome.Shell.Screenshot"
    pub service: String,

    /// Object path, e.g. "/org/gnome/Shell/Screenshot"
    pub path: String,

    /// Interface name, e.g. "org.gnome.Shell.Screenshot"
    pub interface: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Alias table, keyed by the name used on the command line.
    #[serde(default)]
    pub aliases: BTreeMap<String, Alias>,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("com", "dynbus", "dynbus")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file, or create default if not exists
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, alias) in &self.aliases {
            if alias.service.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "alias '{name}' has an empty service"
                )));
            }
            if !alias.path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "alias '{name}': object path must start with '/'"
                )));
            }
            if alias.interface.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "alias '{name}' has an empty interface"
                )));
            }
        }
        Ok(())
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;

        // Create config directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Look up an alias by the name used on the command line.
    pub fn resolve(&self, name: &str) -> Result<&Alias, ConfigError> {
        self.aliases
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAlias(name.to_string()))
    }
}

/// Show the alias table
pub fn show() -> anyhow::Result<()> {
    let config = Config::load()?;
    let path = Config::config_path()?;

    println!("Config file: {}\n", path.display());
    if config.aliases.is_empty() {
        println!("No aliases defined.");
    } else {
        println!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}

/// Add or replace an alias
pub fn add_alias(name: &str, service: &str, path: &str, interface: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    config.aliases.insert(
        name.to_string(),
        Alias {
            service: service.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
        },
    );
    config.validate()?;
    config.save()?;
    println!("Alias '{name}' saved.");
    Ok(())
}

/// Remove an alias
pub fn remove_alias(name: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if config.aliases.remove(name).is_none() {
        return Err(ConfigError::UnknownAlias(name.to_string()).into());
    }
    config.save()?;
    println!("Alias '{name}' removed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===================
    // Default Value Tests
    // ===================

    #[test]
    fn test_default_config_has_no_aliases() {
        let config = Config::default();
        assert!(config.aliases.is_empty());
        assert!(config.validate().is_ok());
    }

    // ===================
    // TOML Parsing Tests
    // ===================

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_parse_alias_table() {
        let toml_str = r#"
[aliases.shell]
service = "org.gnome.Shell.Screenshot"
path = "/org/gnome/Shell/Screenshot"
interface = "org.gnome.Shell.Screenshot"

[aliases.notify]
service = "org.freedesktop.Notifications"
path = "/org/freedesktop/Notifications"
interface = "org.freedesktop.Notifications"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.aliases.len(), 2);
        assert_eq!(
            config.aliases["shell"].service,
            "org.gnome.Shell.Screenshot"
        );
        assert_eq!(
            config.aliases["notify"].path,
            "/org/freedesktop/Notifications"
        );
    }

    #[test]
    fn test_parse_rejects_incomplete_alias() {
        let toml_str = r#"
[aliases.broken]
service = "org.example.Service"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_serialize_and_deserialize_roundtrip() {
        let mut config = Config::default();
        config.aliases.insert(
            "editor".to_string(),
            Alias {
                service: "com.example.editor".to_string(),
                path: "/com/example/editor".to_string(),
                interface: "com.example.ImageEditor".to_string(),
            },
        );
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.aliases, parsed.aliases);
    }

    // ===================
    // Validation Tests
    // ===================

    #[test]
    fn test_validate_empty_service() {
        let mut config = Config::default();
        config.aliases.insert(
            "bad".to_string(),
            Alias {
                service: String::new(),
                path: "/x".to_string(),
                interface: "a.b".to_string(),
            },
        );
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty service"));
    }

    #[test]
    fn test_validate_relative_path() {
        let mut config = Config::default();
        config.aliases.insert(
            "bad".to_string(),
            Alias {
                service: "a.b".to_string(),
                path: "no/leading/slash".to_string(),
                interface: "a.b".to_string(),
            },
        );
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must start with '/'"));
    }

    #[test]
    fn test_validate_empty_interface() {
        let mut config = Config::default();
        config.aliases.insert(
            "bad".to_string(),
            Alias {
                service: "a.b".to_string(),
                path: "/x".to_string(),
                interface: String::new(),
            },
        );
        assert!(config.validate().is_err());
    }

    // ===================
    // Resolution Tests
    // ===================

    #[test]
    fn test_resolve_known_alias() {
        let mut config = Config::default();
        config.aliases.insert(
            "editor".to_string(),
            Alias {
                service: "com.example.editor".to_string(),
                path: "/com/example/editor".to_string(),
                interface: "com.example.ImageEditor".to_string(),
            },
        );
        let alias = config.resolve("editor").unwrap();
        assert_eq!(alias.interface, "com.example.ImageEditor");
    }

    #[test]
    fn test_resolve_unknown_alias() {
        let config = Config::default();
        let err = config.resolve("nope").unwrap_err();
        assert_eq!(err.to_string(), "Unknown alias: nope");
    }
}
