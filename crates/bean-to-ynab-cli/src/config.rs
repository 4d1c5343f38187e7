use anyhow::{Context, Result};
use bean_to_ynab::sync::SyncSettings;
use bean_to_ynab::ynab;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConfigYnab {
    pub base_url: String,
    pub budget_id: String,
}

impl Default for ConfigYnab {
    fn default() -> Self {
        ConfigYnab {
            base_url: ynab::DEFAULT_BASE_URL.to_owned(),
            budget_id: ynab::LAST_USED_BUDGET.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "RawConfigSync")]
pub struct ConfigSync {
    pub scale: u32,
    pub post_zero_difference: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfigSync {
    #[serde(default = "default_scale")]
    scale: u32,
    #[serde(default)]
    post_zero_difference: bool,
}

fn default_scale() -> u32 {
    1000
}

impl TryFrom<RawConfigSync> for ConfigSync {
    type Error = String;

    fn try_from(raw: RawConfigSync) -> Result<Self, Self::Error> {
        if raw.scale == 0 {
            return Err("sync.scale must be greater than zero".to_string());
        }
        Ok(ConfigSync {
            scale: raw.scale,
            post_zero_difference: raw.post_zero_difference,
        })
    }
}

impl Default for ConfigSync {
    fn default() -> Self {
        ConfigSync {
            scale: default_scale(),
            post_zero_difference: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Ledger used when none is given on the command line, relative to the config file.
    #[serde(default)]
    pub ledger: Option<PathBuf>,
    #[serde(default)]
    pub ynab: ConfigYnab,
    #[serde(default)]
    pub sync: ConfigSync,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<(PathBuf, Self)> {
        let base_dir = path.parent().map(ToOwned::to_owned).unwrap_or_default();

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok((base_dir, config))
    }

    pub fn find_and_load() -> Result<Option<(PathBuf, Self)>> {
        let config_locations = [
            Path::new("bean-to-ynab.toml"),
            Path::new(".bean-to-ynab.toml"),
        ];

        for location in &config_locations {
            if location.exists() {
                tracing::debug!("Using config file {}", location.display());
                return Self::load_from_file(location).map(Some);
            }
        }

        Ok(None)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            budget_id: self.ynab.budget_id.clone(),
            scale: self.sync.scale,
            post_zero_difference: self.sync.post_zero_difference,
        }
    }
}
