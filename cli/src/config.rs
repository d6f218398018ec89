//! Settings for the CLI: defaults, an optional TOML file, then flag overrides

use anyhow::{Context, Result};
use arbor_engine::{AdjustPolicy, ReplaceWithReference, ShrinkToward};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Which adjust policy to apply after growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustKind {
    #[default]
    Replace,
    Shrink,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub shrinkage: f64,
    pub min_obs: u64,
    pub adjust: AdjustKind,
    /// Pseudo-count for the `shrink` policy
    pub strength: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            shrinkage: 1.0,
            min_obs: 0,
            adjust: AdjustKind::Replace,
            strength: 1.0,
        }
    }
}

impl Settings {
    /// Read settings from `path`, or use defaults when there is none
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = Self::parse(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(?settings, "loaded settings");
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Command-line values win over the file
    pub fn with_overrides(mut self, shrinkage: Option<f64>, min_obs: Option<u64>) -> Self {
        if let Some(shrinkage) = shrinkage {
            self.shrinkage = shrinkage;
        }
        if let Some(min_obs) = min_obs {
            self.min_obs = min_obs;
        }
        self
    }

    pub fn policy(&self) -> Box<dyn AdjustPolicy> {
        match self.adjust {
            AdjustKind::Replace => Box::new(ReplaceWithReference),
            AdjustKind::Shrink => Box::new(ShrinkToward {
                strength: self.strength,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_engine::NodeDef;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.shrinkage, 1.0);
    }

    #[test]
    fn test_parse_partial_file() {
        let settings = Settings::parse("shrinkage = 0.1\nadjust = \"shrink\"\nstrength = 4.0\n").unwrap();
        assert_eq!(settings.shrinkage, 0.1);
        assert_eq!(settings.min_obs, 0);
        assert_eq!(settings.adjust, AdjustKind::Shrink);
        assert_eq!(settings.strength, 4.0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::parse("learning_rate = 0.1\n").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings::parse("shrinkage = 0.1\nmin_obs = 3\n")
            .unwrap()
            .with_overrides(Some(0.5), None);
        assert_eq!(settings.shrinkage, 0.5);
        assert_eq!(settings.min_obs, 3);
    }

    #[test]
    fn test_policy_selection() {
        let leaf = NodeDef::new(2.0, 1.0, 1);
        let replace = Settings::default().policy();
        assert_eq!(replace.blend(&leaf, 0.0, 5), 0.0);

        let shrink = Settings {
            adjust: AdjustKind::Shrink,
            strength: 1.0,
            ..Settings::default()
        }
        .policy();
        assert_eq!(shrink.blend(&leaf, 0.0, 5), 1.0);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Settings::load(Some(Path::new("/nonexistent/arbor.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/arbor.toml"));
    }
}
