use anyhow::{Context, bail, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "labelkeeper.toml";

/// Commented default configuration written by `labelkeeper init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# labelkeeper configuration

[dataset]
# Dataset root directory
root = "."
# Directory under the root holding one subdirectory per partition
labels_dir = "labels"
# Partitions to scan, in order. Missing partitions are skipped with a warning
partitions = ["train", "val"]
# Annotation file extension, without the dot
extension = "txt"

[rules]
# Slack allowed outside [0, 1] for box centers and edges (0 = exact)
tolerance = 0.0
"#;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub rules: RulesConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub labels_dir: String,
    pub partitions: Vec<String>,
    pub extension: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            labels_dir: "labels".to_string(),
            partitions: default_partitions(),
            extension: "txt".to_string(),
        }
    }
}

fn default_partitions() -> Vec<String> {
    vec!["train".to_string(), "val".to_string()]
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub tolerance: f64,
}

impl Config {
    /// Load configuration from `path`, or from `labelkeeper.toml` if present,
    /// or built-in defaults, then apply dot-notation overrides
    pub fn load(path: Option<&str>, overrides: &[String]) -> anyhow::Result<Self> {
        let content = match path {
            Some(path) => read(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => read(DEFAULT_CONFIG_PATH)?,
            None => {
                debug!("No config file, using defaults");
                String::new()
            }
        };
        Self::parse(&content, overrides)
    }

    /// Parse TOML content and apply overrides (e.g. `dataset.extension=label`)
    pub fn parse(content: &str, overrides: &[String]) -> anyhow::Result<Self> {
        let mut table: toml::Table = toml::from_str(content).context("Invalid config")?;
        for entry in overrides {
            apply_override(&mut table, entry)?;
        }
        let config: Config = toml::Value::Table(table)
            .try_into()
            .context("Invalid config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.dataset.partitions.is_empty(),
            "dataset.partitions must not be empty"
        );
        ensure!(
            self.dataset.partitions.iter().all(|p| !p.trim().is_empty()),
            "dataset.partitions must not contain empty names"
        );
        ensure!(
            !self.dataset.extension.trim().is_empty(),
            "dataset.extension must not be empty"
        );
        ensure!(
            self.rules.tolerance.is_finite() && self.rules.tolerance >= 0.0,
            "rules.tolerance must be a finite number >= 0, found {}",
            self.rules.tolerance
        );
        Ok(())
    }
}

fn read(path: &str) -> anyhow::Result<String> {
    debug!("Loading config from {}", path);
    fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path))
}

/// Apply `key.path=value`, creating intermediate tables as needed. The value
/// is parsed as a TOML value, falling back to a plain string.
fn apply_override(table: &mut toml::Table, entry: &str) -> anyhow::Result<()> {
    let Some((key, raw)) = entry.split_once('=') else {
        bail!("Invalid config override '{}', expected KEY=VALUE", entry);
    };
    let keys: Vec<&str> = key.trim().split('.').collect();
    if keys.iter().any(|k| k.is_empty()) {
        bail!("Invalid config override key '{}'", key);
    }

    let value = parse_value(raw.trim());
    debug!("Config override: {} = {}", key.trim(), value);

    let Some((last, parents)) = keys.split_last() else {
        bail!("Invalid config override key '{}'", key);
    };
    let mut current = table;
    for parent in parents {
        let entry = current
            .entry(parent.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        current = match entry {
            toml::Value::Table(inner) => inner,
            _ => bail!("Config override '{}': '{}' is not a table", key.trim(), parent),
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

/// Write the default configuration to `path`
pub fn write_default(path: &str, overwrite: bool) -> anyhow::Result<()> {
    if Path::new(path).exists() && !overwrite {
        bail!("{} already exists (use --override to replace it)", path);
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config file {}", path))
}
