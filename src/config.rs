//! Application-level configuration: where the JSON stores live.
//!
//! Precedence, lowest to highest: built-in default (platform config dir),
//! optional TOML file, `MAILBURST_*` environment variables. The CLI's
//! `--data-dir` flag overrides all of these.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::stores::{DraftStore, RecipientStore, SettingsStore};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory holding config.json, emails.json and draft.json.
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let default_dir = default_data_dir();
        let mut builder = Config::builder()
            .set_default("data_dir", default_dir.to_string_lossy().as_ref())?;

        // An explicitly named file must exist; the conventional one is optional.
        builder = match config_path {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("mailburst").required(false)),
        };

        // e.g. `MAILBURST_DATA_DIR=...` overrides `data_dir`.
        builder = builder.add_source(Environment::with_prefix("MAILBURST").ignore_empty(true));

        builder.build()?.try_deserialize()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SettingsStore::FILE_NAME)
    }

    pub fn recipients_path(&self) -> PathBuf {
        self.data_dir.join(RecipientStore::FILE_NAME)
    }

    pub fn draft_path(&self) -> PathBuf {
        self.data_dir.join(DraftStore::FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("mailburst"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn environment_overrides_the_default_data_dir() {
        std::env::set_var("MAILBURST_DATA_DIR", "/tmp/mailburst-env-test");
        let settings = Settings::new(None).unwrap();
        std::env::remove_var("MAILBURST_DATA_DIR");
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/mailburst-env-test"));
    }

    #[test]
    #[serial]
    fn config_file_sets_the_data_dir() {
        std::env::remove_var("MAILBURST_DATA_DIR");
        let dir = tempfile::TempDir::new().unwrap();
        let file_path = dir.path().join("mailburst.toml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        writeln!(file, "data_dir = \"/srv/mail-data\"").unwrap();

        let settings = Settings::new(Some(file_path.to_str().unwrap())).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/srv/mail-data"));
    }

    #[test]
    #[serial]
    fn store_paths_hang_off_the_data_dir() {
        std::env::set_var("MAILBURST_DATA_DIR", "/var/lib/mailburst");
        let settings = Settings::new(None).unwrap();
        std::env::remove_var("MAILBURST_DATA_DIR");
        assert_eq!(
            settings.settings_path(),
            PathBuf::from("/var/lib/mailburst/config.json")
        );
        assert_eq!(
            settings.recipients_path(),
            PathBuf::from("/var/lib/mailburst/emails.json")
        );
        assert_eq!(
            settings.draft_path(),
            PathBuf::from("/var/lib/mailburst/draft.json")
        );
    }
}
