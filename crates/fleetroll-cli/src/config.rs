//! fleetroll.toml configuration parser.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use fleetroll_state::WorkflowDefaults;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fleetroll.toml";

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,fleetroll=debug";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetrollConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Workflow knobs applied to first messages that leave them out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub pause_seconds: Option<u64>,
    pub growth_percent: Option<u32>,
    pub iters_per_instance: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl DefaultsConfig {
    pub fn resolve(&self) -> WorkflowDefaults {
        let base = WorkflowDefaults::default();
        WorkflowDefaults {
            pause_seconds: self.pause_seconds.unwrap_or(base.pause_seconds),
            growth_percent: self.growth_percent.unwrap_or(base.growth_percent),
            iters_per_instance: self.iters_per_instance.unwrap_or(base.iters_per_instance),
        }
    }
}

impl FleetrollConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: FleetrollConfig =
            toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path`, or `./fleetroll.toml` if present, or built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A config with every knob spelled out at its default.
    pub fn scaffold() -> Self {
        let defaults = WorkflowDefaults::default();
        FleetrollConfig {
            defaults: DefaultsConfig {
                pause_seconds: Some(defaults.pause_seconds),
                growth_percent: Some(defaults.growth_percent),
                iters_per_instance: Some(defaults.iters_per_instance),
            },
            logging: LoggingConfig {
                filter: Some(DEFAULT_LOG_FILTER.to_string()),
                format: Some(LogFormat::Text),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold_roundtrips() {
        let toml_str = FleetrollConfig::scaffold().to_toml_string().unwrap();
        assert!(toml_str.contains("[defaults]"));
        assert!(toml_str.contains("pause_seconds = 30"));
        assert!(toml_str.contains("format = \"text\""));

        let back: FleetrollConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.defaults.resolve(), WorkflowDefaults::default());
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
[defaults]
growth_percent = 50

[logging]
format = "json"
"#;
        let config: FleetrollConfig = toml::from_str(toml_str).unwrap();
        let defaults = config.defaults.resolve();
        assert_eq!(defaults.growth_percent, 50);
        assert_eq!(defaults.pause_seconds, 30);
        assert_eq!(defaults.iters_per_instance, 10);
        assert_eq!(config.logging.format, Some(LogFormat::Json));
        assert!(config.logging.filter.is_none());
    }

    #[test]
    fn test_parse_empty() {
        let config: FleetrollConfig = toml::from_str("").unwrap();
        assert_eq!(config.defaults.resolve(), WorkflowDefaults::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetroll.toml");
        std::fs::write(&path, "[defaults]\npause_seconds = 5\n").unwrap();

        let config = FleetrollConfig::load(Some(&path)).unwrap();
        assert_eq!(config.defaults.resolve().pause_seconds, 5);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FleetrollConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
