//! Configuration loader utilities

use crate::builder::validate_catalog;
use crate::{Config, ConfigBuilder, ConfigError, ConfigResult};
use devwatch_types::{DeviceCatalog, RecognitionRule};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "DEVWATCH";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first file found in the default locations
    pub fn load_default() -> ConfigResult<Config> {
        let mut builder = ConfigBuilder::new();

        if let Some(path) = Self::config_exists() {
            info!(path = %path.display(), "Using configuration file");
            builder = builder.add_source_file(&path);
        } else {
            debug!("No configuration file found, using defaults");
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(not_found(path));
        }

        ConfigBuilder::new()
            .add_source_file(path)
            .add_env_prefix(ENV_PREFIX)
            .build()
    }

    /// Load configuration from multiple files (later files override earlier ones)
    pub fn load_from_files<P: AsRef<Path>>(paths: &[P]) -> ConfigResult<Config> {
        let mut builder = ConfigBuilder::new();

        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                builder = builder.add_source_file(path);
            }
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load a standalone catalog file holding only a list of rules
    ///
    /// The format is chosen by extension like configuration files are.
    pub fn load_catalog<P: AsRef<Path>>(path: P) -> ConfigResult<DeviceCatalog> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let rules: Vec<RecognitionRule> = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                #[derive(serde::Deserialize)]
                struct TomlCatalog {
                    devices: Vec<RecognitionRule>,
                }
                toml::from_str::<TomlCatalog>(&content)
                    .map_err(|e| parse_error(e.to_string()))?
                    .devices
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            _ => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        };

        let catalog = DeviceCatalog::new(rules);
        validate_catalog(&catalog)?;
        debug!(path = %path.display(), rules = catalog.len(), "Loaded device catalog");
        Ok(catalog)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(config).map_err(|e| ConfigError::Serialization {
                    message: format!("Failed to serialize to TOML: {}", e),
                })?
            }
            Some("json") => {
                serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialization {
                    message: format!("Failed to serialize to JSON: {}", e),
                })?
            }
            _ => serde_yaml::to_string(config).map_err(|e| ConfigError::Serialization {
                message: format!("Failed to serialize to YAML: {}", e),
            })?,
        };

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a default configuration file with an empty device catalog
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        let config = Config::default().with_devices(Vec::new());
        Self::save_to_file(&config, path)
    }

    /// Get default configuration file paths in order of preference
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("devwatch.yaml"),
            PathBuf::from("devwatch.yml"),
            PathBuf::from("devwatch.toml"),
            PathBuf::from("devwatch.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let devwatch_dir = config_dir.join("devwatch");
            paths.push(devwatch_dir.join("config.yaml"));
            paths.push(devwatch_dir.join("config.yml"));
            paths.push(devwatch_dir.join("config.toml"));
        }

        #[cfg(unix)]
        {
            paths.push(PathBuf::from("/etc/devwatch/config.yaml"));
            paths.push(PathBuf::from("/etc/devwatch/config.yml"));
            paths.push(PathBuf::from("/etc/devwatch/config.toml"));
        }

        paths
    }

    /// Check if a configuration file exists in default locations
    pub fn config_exists() -> Option<PathBuf> {
        Self::default_config_paths()
            .into_iter()
            .find(|path| path.exists())
    }

    /// Validate a configuration file without keeping it
    pub fn validate_file<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::load_from_file(path).map(|_| ())
    }
}

pub(crate) fn not_found(path: &Path) -> ConfigError {
    ConfigError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Configuration file not found",
        ),
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
            })
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|home| PathBuf::from(home).join(".config"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devwatch_types::DeviceKind;
    use rstest::rstest;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        Config::default().with_devices(vec![
            RecognitionRule::new("IPOD1", "Classic").with_kind(DeviceKind::MediaPlayer),
            RecognitionRule::new("CAM7", "Camera").with_description("Card reader slot"),
        ])
    }

    #[rstest]
    #[case("devwatch.yaml")]
    #[case("devwatch.toml")]
    #[case("devwatch.json")]
    fn test_save_and_load(#[case] file_name: &str) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(file_name);

        let original = sample_config();
        ConfigLoader::save_to_file(&original, &config_path).unwrap();

        let loaded = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.catalog(), original.catalog());
        assert_eq!(loaded.monitor, original.monitor);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::load_from_file(temp_dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_files_later_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("base.yaml");
        let local = temp_dir.path().join("local.yaml");
        std::fs::write(&base, "monitor:\n  poll_interval_ms: 1000\ndevices: []\n").unwrap();
        std::fs::write(&local, "monitor:\n  poll_interval_ms: 300\n").unwrap();

        let config = ConfigLoader::load_from_files(&[&base, &local]).unwrap();
        assert_eq!(config.monitor.poll_interval_ms, 300);
        assert!(config.catalog().unwrap().is_empty());
    }

    #[test]
    fn test_generate_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("default.yaml");

        ConfigLoader::generate_default_config(&config_path).unwrap();
        assert!(config_path.exists());

        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert!(config.catalog().unwrap().is_empty());
        ConfigLoader::validate_file(&config_path).unwrap();
    }

    #[test]
    fn test_load_catalog_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "- recognize_pattern: IPOD1\n  name: Classic\n- recognize_pattern: IPOD1\n  name: Shadowed\n",
        )
        .unwrap();

        let catalog = ConfigLoader::load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.recognize(&"IPOD1".into()).unwrap().name(), "Classic");
    }

    #[test]
    fn test_load_catalog_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            "[[devices]]\nrecognize_pattern = \"CAM7\"\nname = \"Camera\"\nkind = \"camera\"\n",
        )
        .unwrap();

        let catalog = ConfigLoader::load_catalog(&path).unwrap();
        assert_eq!(catalog.devices()[0].kind, DeviceKind::Camera);
    }

    #[test]
    fn test_load_catalog_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        std::fs::write(&path, "{ \"not\": \"a list\" }").unwrap();

        let err = ConfigLoader::load_catalog(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_default_paths_prefer_current_directory() {
        let paths = ConfigLoader::default_config_paths();
        assert_eq!(paths[0], PathBuf::from("devwatch.yaml"));
        assert!(paths.len() >= 4);
    }
}
