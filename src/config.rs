use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::rainfall::Version;

pub const DATASET_DIR_VAR: &str = "RAINRATE_DATASET_DIR";
pub const VERSION_VAR: &str = "RAINRATE_VERSION";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root directory holding the `p837/` and `p1510/` datasets.
    pub dataset_dir: PathBuf,
    /// Recommendation version used when the session starts (6 or 7).
    pub version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset_dir: PathBuf::from("data"),
            version: Version::default().number(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Config::default();
        if let Ok(dir) = env::var(DATASET_DIR_VAR) {
            config.dataset_dir = PathBuf::from(dir);
        }
        if let Ok(version) = env::var(VERSION_VAR) {
            config.version = version.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be 6 or 7 (got '{}')", VERSION_VAR, version))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: Config =
            toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("{}: {}", path.display(), err)))?;
        Self::from_toml_str(&text)
    }

    pub fn version(&self) -> Result<Version, Error> {
        Version::try_from(i64::from(self.version))
    }

    fn validate(&self) -> Result<(), Error> {
        self.version().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.version().unwrap(), Version::V7);
        assert_eq!(config.dataset_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_from_toml() {
        let config =
            Config::from_toml_str("dataset_dir = \"/srv/itu\"\nversion = 6\n").unwrap();
        assert_eq!(config.dataset_dir, PathBuf::from("/srv/itu"));
        assert_eq!(config.version().unwrap(), Version::V6);

        let partial = Config::from_toml_str("version = 7").unwrap();
        assert_eq!(partial.dataset_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        assert_eq!(
            Config::from_toml_str("version = 5"),
            Err(Error::InvalidVersion(5))
        );
        assert!(matches!(
            Config::from_toml_str("unknown = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rainrate.toml");
        std::fs::write(&path, "dataset_dir = \"datasets\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.dataset_dir, PathBuf::from("datasets"));
        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}
