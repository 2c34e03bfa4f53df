use crate::models::{LaunchpadSettings, StorageSnapshot};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables that override settings, e.g.
/// `LAUNCHPAD_EXCERPT_LENGTH=60`.
pub const ENV_PREFIX: &str = "LAUNCHPAD";

/// Configuration manager for loading and saving YAML configuration files.
///
/// Manages two files in the configuration directory:
/// - Settings (`launchpad.yaml`): excerpt length, timestamp format, logging
/// - Load-order snapshot (`loadorder.yaml`): storage contents used to seed an
///   in-memory storage
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    snapshot_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "Launchpad Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("launchpad.yaml"),
            snapshot_path: config_dir.join("loadorder.yaml"),
            config_dir,
        })
    }

    /// Load settings, layering `LAUNCHPAD_*` environment variables over the
    /// settings file. A missing file means defaults.
    pub fn load_settings(&self) -> Result<LaunchpadSettings> {
        self.load_settings_from(settings_environment())
    }

    /// Like [`load_settings`](Self::load_settings), but reading the
    /// `LAUNCHPAD_*` overrides from `vars` instead of the process environment.
    pub fn load_settings_with_overrides<I>(&self, vars: I) -> Result<LaunchpadSettings>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: ::config::Map<String, String> = vars.into_iter().collect();
        self.load_settings_from(settings_environment().source(Some(vars)))
    }

    fn load_settings_from(&self, environment: ::config::Environment) -> Result<LaunchpadSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: LaunchpadSettings = ::config::Config::builder()
            .add_source(
                ::config::File::from(self.settings_path.as_std_path())
                    .format(::config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &LaunchpadSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the load-order snapshot.
    ///
    /// # Returns
    /// The loaded snapshot, or an empty one if the file doesn't exist
    pub fn load_snapshot(&self) -> Result<StorageSnapshot> {
        if !self.snapshot_path.exists() {
            tracing::warn!(
                "Load-order snapshot not found at {}, starting empty",
                self.snapshot_path
            );
            return Ok(StorageSnapshot::default());
        }

        let file_contents = fs::read_to_string(&self.snapshot_path)
            .with_context(|| format!("Failed to read snapshot: {}", self.snapshot_path))?;

        let snapshot: StorageSnapshot = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse snapshot: {}", self.snapshot_path))?;

        tracing::info!(
            "Loaded snapshot from {} ({} identifiers)",
            self.snapshot_path,
            snapshot.order.len()
        );
        Ok(snapshot)
    }

    /// Save the load-order snapshot.
    pub fn save_snapshot(&self, snapshot: &StorageSnapshot) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(snapshot).context("Failed to serialize snapshot to YAML")?;

        fs::write(&self.snapshot_path, yaml_string)
            .with_context(|| format!("Failed to write snapshot: {}", self.snapshot_path))?;

        tracing::info!("Saved snapshot to {}", self.snapshot_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    pub fn snapshot_path(&self) -> &Utf8Path {
        &self.snapshot_path
    }
}

fn settings_environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Configuration;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.settings_path().ends_with("launchpad.yaml"));
    }

    #[test]
    fn test_missing_settings_use_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let settings = manager.load_settings().unwrap();
        assert_eq!(settings.excerpt_length, 100);
    }

    #[test]
    fn test_load_save_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = LaunchpadSettings {
            excerpt_length: 42,
            debug_mode: true,
            ..Default::default()
        };
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded.excerpt_length, 42);
        assert!(loaded.debug_mode);
        assert_eq!(loaded.placeholder_title, settings.placeholder_title);
    }

    #[test]
    fn test_load_save_snapshot() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.load_snapshot().unwrap().order.is_empty());

        let snapshot = StorageSnapshot {
            order: vec!["a".to_string()],
            configurations: [("a".to_string(), Configuration::addon(true))]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        manager.save_snapshot(&snapshot).unwrap();

        assert_eq!(manager.load_snapshot().unwrap(), snapshot);
    }
}
