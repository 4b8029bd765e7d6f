//! Server configuration.
//!
//! Loaded from a RON file; every field has a default, so a missing file or
//! a file listing a single field are both valid.
//!
//! ```ron
//! ServerConfig(
//!     max_scenes_per_combat: 128,
//!     data_path: "data/combat.ron",
//!     seed_policy: Fixed(7),
//! )
//! ```

use std::path::{Path, PathBuf};

use combat_core::scene::SceneId;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Seed used when a combat request carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SeedPolicy {
    /// Seed with the allocated scene id.
    #[default]
    SceneId,
    /// Seed every unseeded scene with the same value.
    Fixed(u64),
}

impl SeedPolicy {
    /// Seed for an unseeded request on scene `id`.
    #[must_use]
    pub const fn seed_for(self, id: SceneId) -> u64 {
        match self {
            Self::SceneId => id,
            Self::Fixed(seed) => seed,
        }
    }
}

/// Battle server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Scenes that may run at once.
    pub max_scenes_per_combat: usize,
    /// Static combat data file.
    pub data_path: PathBuf,
    /// Seed for unseeded requests.
    pub seed_policy: SeedPolicy,
    /// Overrides the data set's tick period.
    pub tick_interval_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_scenes_per_combat: 256,
            data_path: PathBuf::from("data/combat.ron"),
            seed_policy: SeedPolicy::default(),
            tick_interval_ms: None,
        }
    }
}

impl ServerConfig {
    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ConfigParse`] naming `path` on malformed input.
    pub fn from_ron_str(path: &Path, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ServerError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file, or the defaults when `path` does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no server config, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config =
            ServerConfig::from_ron_str(Path::new("inline"), "(max_scenes_per_combat: 4)").unwrap();
        assert_eq!(config.max_scenes_per_combat, 4);
        assert_eq!(config.data_path, PathBuf::from("data/combat.ron"));
        assert_eq!(config.seed_policy, SeedPolicy::SceneId);
    }

    #[test]
    fn test_seed_policy() {
        assert_eq!(SeedPolicy::SceneId.seed_for(9), 9);
        assert_eq!(SeedPolicy::Fixed(3).seed_for(9), 3);

        let config =
            ServerConfig::from_ron_str(Path::new("inline"), "(seed_policy: Fixed(11))").unwrap();
        assert_eq!(config.seed_policy, SeedPolicy::Fixed(11));
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = ServerConfig::from_ron_str(Path::new("server.ron"), "(max_scenes").unwrap_err();
        assert!(err.to_string().contains("server.ron"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load_or_default(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ron");
        std::fs::write(&path, "(max_scenes_per_combat: 2, tick_interval_ms: Some(5))").unwrap();

        let config = ServerConfig::load_or_default(&path).unwrap();
        assert_eq!(config.max_scenes_per_combat, 2);
        assert_eq!(config.tick_interval_ms, Some(5));
    }
}
