// TWatch - Motion feature configuration persistence
//
// `bma.json` is the current format. `bma.cfg` is the old raw dump of the
// per-feature enable flags; it is only read when no JSON file exists, then
// rewritten as JSON and removed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use crate::config::{BMA_JSON_CONFIG_FILE, BMA_LEGACY_CONFIG_FILE};
use crate::motion::sensor::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionConfig {
    pub stepcounter: bool,
    pub doubleclick: bool,
    pub tilt: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            stepcounter: true,
            doubleclick: true,
            tilt: false,
        }
    }
}

impl MotionConfig {
    pub fn get(&self, feature: Feature) -> bool {
        match feature {
            Feature::StepCounter => self.stepcounter,
            Feature::DoubleClick => self.doubleclick,
            Feature::Tilt        => self.tilt,
        }
    }

    pub fn set(&mut self, feature: Feature, enable: bool) {
        match feature {
            Feature::StepCounter => self.stepcounter = enable,
            Feature::DoubleClick => self.doubleclick = enable,
            Feature::Tilt        => self.tilt = enable,
        }
    }

    /// Legacy layout: one `bool` byte per feature, in `Feature::ALL` order.
    /// A short file only overrides the leading features.
    fn apply_legacy_bytes(&mut self, raw: &[u8]) {
        for (feature, byte) in Feature::ALL.into_iter().zip(raw) {
            self.set(feature, *byte != 0);
        }
    }

    /// Each flag is read on its own; a missing or mistyped one keeps its
    /// default instead of discarding the whole document.
    fn from_json(doc: &Value) -> Self {
        let mut config = Self::default();
        for feature in Feature::ALL {
            match doc.get(feature.key()) {
                Some(value) => match value.as_bool() {
                    Some(enable) => config.set(feature, enable),
                    None => log::warn!("bma config: {} is not a bool ({})", feature.key(), value),
                },
                None => log::debug!("bma config: {} missing, using default", feature.key()),
            }
        }
        config
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Json,
    MigratedLegacy,
    Defaults,
}

pub struct ConfigStore {
    json_path: PathBuf,
    legacy_path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at `dir` (the SPIFFS mount point on the watch).
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            json_path: dir.join(BMA_JSON_CONFIG_FILE),
            legacy_path: dir.join(BMA_LEGACY_CONFIG_FILE),
        }
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn legacy_path(&self) -> &Path {
        &self.legacy_path
    }

    pub fn load(&self) -> MotionConfig {
        self.load_with_source().0
    }

    pub fn load_with_source(&self) -> (MotionConfig, ConfigSource) {
        if self.json_path.exists() {
            match self.read_json() {
                Ok(config) => return (config, ConfigSource::Json),
                Err(e) => {
                    log::error!("{:#}", e);
                    return (MotionConfig::default(), ConfigSource::Defaults);
                }
            }
        }

        log::info!("no json config exists, read from binary");
        match self.read_legacy() {
            Ok(config) => {
                self.save(&config);
                (config, ConfigSource::MigratedLegacy)
            }
            Err(e) => {
                log::warn!("{:#}", e);
                (MotionConfig::default(), ConfigSource::Defaults)
            }
        }
    }

    /// Write `config` as JSON, replacing any previous file. A leftover legacy
    /// file is removed first. Failures are logged, never returned.
    pub fn save(&self, config: &MotionConfig) {
        if self.legacy_path.exists() {
            match fs::remove_file(&self.legacy_path) {
                Ok(()) => log::info!("remove old binary bma config"),
                Err(e) => log::error!("Can't remove {}: {}", self.legacy_path.display(), e),
            }
        }

        if let Err(e) = self.write_json(config) {
            log::error!("{:#}", e);
        }
    }

    fn read_json(&self) -> anyhow::Result<MotionConfig> {
        let text = fs::read_to_string(&self.json_path)
            .with_context(|| format!("Can't open file: {}", self.json_path.display()))?;
        let doc: Value = serde_json::from_str(&text)
            .with_context(|| format!("deserialize {} failed", self.json_path.display()))?;
        Ok(MotionConfig::from_json(&doc))
    }

    fn write_json(&self, config: &MotionConfig) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(config).context("Failed to serialize bma config")?;
        fs::write(&self.json_path, text)
            .with_context(|| format!("Can't open file: {}", self.json_path.display()))
    }

    fn read_legacy(&self) -> anyhow::Result<MotionConfig> {
        let raw = fs::read(&self.legacy_path)
            .with_context(|| format!("Can't open file: {}", self.legacy_path.display()))?;
        let expected = Feature::ALL.len();
        if raw.len() > expected {
            anyhow::bail!(
                "Failed to read configfile. Wrong filesize! ({} > {} bytes)",
                raw.len(),
                expected
            );
        }

        let mut config = MotionConfig::default();
        config.apply_legacy_bytes(&raw);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn nothing_on_disk_gives_defaults() {
        let (_dir, store) = store();
        let (config, source) = store.load_with_source();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config, MotionConfig { stepcounter: true, doubleclick: true, tilt: false });
        assert!(!store.json_path().exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = store();
        let config = MotionConfig { stepcounter: false, doubleclick: true, tilt: true };
        store.save(&config);

        assert_eq!(store.load_with_source(), (config, ConfigSource::Json));
    }

    #[test]
    fn saved_document_uses_feature_keys() {
        let (_dir, store) = store();
        store.save(&MotionConfig { stepcounter: true, doubleclick: false, tilt: true });

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.json_path()).unwrap()).unwrap();
        assert_eq!(doc["stepcounter"], true);
        assert_eq!(doc["doubleclick"], false);
        assert_eq!(doc["tilt"], true);
    }

    #[test]
    fn legacy_file_is_migrated_once() {
        let (_dir, store) = store();
        fs::write(store.legacy_path(), [0u8, 1, 1]).unwrap();

        let (config, source) = store.load_with_source();
        let expected = MotionConfig { stepcounter: false, doubleclick: true, tilt: true };
        assert_eq!((config, source), (expected, ConfigSource::MigratedLegacy));
        assert!(store.json_path().exists());
        assert!(!store.legacy_path().exists());

        assert_eq!(store.load_with_source(), (expected, ConfigSource::Json));
    }

    #[test]
    fn json_wins_over_legacy() {
        let (_dir, store) = store();
        fs::write(store.json_path(), r#"{"stepcounter":false,"doubleclick":false,"tilt":false}"#)
            .unwrap();
        fs::write(store.legacy_path(), [1u8, 1, 1]).unwrap();

        let (config, source) = store.load_with_source();
        assert_eq!(source, ConfigSource::Json);
        assert!(!config.stepcounter && !config.doubleclick && !config.tilt);
        // Not consulted, so not touched either.
        assert!(store.legacy_path().exists());
    }

    #[test]
    fn oversized_legacy_file_is_skipped() {
        let (_dir, store) = store();
        fs::write(store.legacy_path(), [0u8; 8]).unwrap();

        let (config, source) = store.load_with_source();
        assert_eq!((config, source), (MotionConfig::default(), ConfigSource::Defaults));
        assert!(!store.json_path().exists());
        assert!(store.legacy_path().exists());
    }

    #[test]
    fn short_legacy_file_keeps_trailing_defaults() {
        let (_dir, store) = store();
        fs::write(store.legacy_path(), [0u8]).unwrap();

        let config = store.load();
        assert_eq!(config, MotionConfig { stepcounter: false, doubleclick: true, tilt: false });
    }

    #[test]
    fn corrupt_json_falls_back_to_defaults() {
        let (_dir, store) = store();
        fs::write(store.json_path(), "{ stepcounter: nope").unwrap();

        assert_eq!(store.load_with_source(), (MotionConfig::default(), ConfigSource::Defaults));
    }

    #[test]
    fn missing_json_fields_take_defaults() {
        let (_dir, store) = store();
        fs::write(store.json_path(), r#"{"doubleclick":false}"#).unwrap();

        assert_eq!(
            store.load(),
            MotionConfig { stepcounter: true, doubleclick: false, tilt: false }
        );
    }

    #[test]
    fn mistyped_json_field_only_resets_that_flag() {
        let (_dir, store) = store();
        fs::write(store.json_path(), r#"{"stepcounter":false,"doubleclick":false,"tilt":1}"#)
            .unwrap();

        assert_eq!(
            store.load_with_source(),
            (
                MotionConfig { stepcounter: false, doubleclick: false, tilt: false },
                ConfigSource::Json
            )
        );
    }

    #[test]
    fn json_that_is_not_an_object_takes_defaults() {
        let (_dir, store) = store();
        fs::write(store.json_path(), "[true, false, true]").unwrap();

        assert_eq!(store.load_with_source(), (MotionConfig::default(), ConfigSource::Json));
    }

    #[test]
    fn save_into_missing_directory_is_logged_not_fatal() {
        let (dir, _) = store();
        let store = ConfigStore::new(dir.path().join("not-mounted"));
        store.save(&MotionConfig::default());
        assert!(!store.json_path().exists());
    }
}
