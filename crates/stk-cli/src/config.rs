//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use stk_backup::{BackupConfig, RetentionPolicy};
use stk_core::SamplePolicy;
use stk_db::StorePaths;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backup: BackupSettings,
    pub stores: StoreSettings,
    pub usage: UsageSettings,
}

/// Automatic backup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Whether the recurring schedule is armed in `stk backup watch`.
    pub enabled: bool,
    /// Hours between scheduled snapshots.
    pub interval_hours: u64,
    /// Snapshot retention horizon in days; 0 keeps everything.
    pub retention_days: u32,
    /// Snapshot root; defaults to the data directory when unset.
    pub destination: Option<PathBuf>,
}

/// Optional overrides for the store locations, mainly for testing against
/// copies of the stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    pub event_store: Option<PathBuf>,
    pub settings_dir: Option<PathBuf>,
}

/// Aggregation policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSettings {
    /// Seconds credited to an event with no end time.
    pub default_sample_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backup: BackupSettings {
                enabled: true,
                interval_hours: 24,
                retention_days: 0,
                destination: None,
            },
            stores: StoreSettings::default(),
            usage: UsageSettings {
                default_sample_secs: SamplePolicy::default().default_sample_secs,
            },
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Nested keys use a double underscore in the environment, e.g.
    /// `STK_BACKUP__INTERVAL_HOURS=6`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (STK_*)
        figment = figment.merge(Env::prefixed("STK_").split("__"));

        figment.extract()
    }

    /// The store locations after applying any configured overrides.
    ///
    /// Returns `None` only when a location is neither configured nor
    /// derivable from the home directory.
    #[must_use]
    pub fn store_paths(&self) -> Option<StorePaths> {
        let located = StorePaths::locate();
        let event_store = self
            .stores
            .event_store
            .clone()
            .or_else(|| located.as_ref().map(|p| p.event_store().to_path_buf()))?;
        let settings_dir = self
            .stores
            .settings_dir
            .clone()
            .or_else(|| located.as_ref().map(|p| p.settings_dir().to_path_buf()))?;
        Some(StorePaths::new(event_store, settings_dir))
    }

    /// Snapshot root directory.
    #[must_use]
    pub fn backup_destination(&self) -> PathBuf {
        self.backup.destination.clone().unwrap_or_else(|| {
            dirs_data_path()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("backups")
        })
    }

    /// The missing-end-time duration policy.
    #[must_use]
    pub const fn sample_policy(&self) -> SamplePolicy {
        SamplePolicy {
            default_sample_secs: self.usage.default_sample_secs,
        }
    }

    /// The snapshot retention policy.
    #[must_use]
    pub const fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.backup.retention_days)
    }

    /// The full backup service configuration.
    #[must_use]
    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig {
            enabled: self.backup.enabled,
            interval_hours: self.backup.interval_hours,
            retention: self.retention(),
            destination: self.backup_destination(),
        }
    }
}

/// Returns the platform-specific config directory for stk.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stk"))
}

/// Returns the platform-specific data directory for stk.
///
/// On Linux: `~/.local/share/stk`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("stk"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backup_destination_is_under_data_dir() {
        let config = Config::default();
        let destination = config.backup_destination();
        assert!(destination.ends_with("stk/backups"));
    }

    #[test]
    fn default_retention_is_unlimited() {
        let config = Config::default();
        assert!(config.retention().is_unlimited());
    }

    #[test]
    fn default_sample_policy_is_sixty_seconds() {
        let config = Config::default();
        assert_eq!(config.sample_policy().default_sample_secs, 60);
    }

    #[test]
    fn store_overrides_take_precedence() {
        let mut config = Config::default();
        config.stores.event_store = Some(PathBuf::from("/tmp/copy/knowledgeC.db"));
        config.stores.settings_dir = Some(PathBuf::from("/tmp/copy/screentime"));
        let paths = config.store_paths().unwrap();
        assert_eq!(paths.event_store(), Path::new("/tmp/copy/knowledgeC.db"));
        assert_eq!(paths.settings_dir(), Path::new("/tmp/copy/screentime"));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[backup]
enabled = false
interval_hours = 6
retention_days = 45
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert!(!config.backup.enabled);
        assert_eq!(config.backup.interval_hours, 6);
        assert_eq!(config.backup.retention_days, 45);
        // Untouched sections keep their defaults.
        assert_eq!(config.usage.default_sample_secs, 60);
    }
}
