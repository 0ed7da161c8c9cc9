//! CLI configuration management.
//!
//! Settings are layered with increasing precedence: built-in defaults, a
//! JSON config file, `QF_*` environment variables (after loading `.env`),
//! and finally command-line flags.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use quadforce::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Effective settings for a `qf` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulation tunables, stored flat alongside the run settings.
    #[serde(flatten)]
    pub layout: LayoutConfig,

    /// Iterations performed per update tick.
    pub iterations_per_update: usize,

    /// Wall-clock budget for a run, in seconds.
    pub timeout_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            iterations_per_update: 10,
            timeout_secs: 30.0,
        }
    }
}

impl Config {
    /// Load defaults, then the optional config file, then the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a (possibly partial) JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Override fields from `QF_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let layout = &mut self.layout;
        override_from(&lookup, "QF_SPRING_REST_LENGTH", &mut layout.spring_rest_length)?;
        override_from(&lookup, "QF_REPULSIVE_FORCE_CONSTANT", &mut layout.repulsive_force_constant)?;
        override_from(&lookup, "QF_SPRING_CONSTANT", &mut layout.spring_constant)?;
        override_from(&lookup, "QF_DELTA_T", &mut layout.delta_t)?;
        override_from(&lookup, "QF_CENTER_FORCE", &mut layout.center_force)?;
        override_from(
            &lookup,
            "QF_STABILIZED_MAX_DISPLACEMENT",
            &mut layout.stabilized_max_displacement,
        )?;
        override_from(
            &lookup,
            "QF_STABILIZED_AVG_DISPLACEMENT",
            &mut layout.stabilized_avg_displacement,
        )?;
        override_from(&lookup, "QF_MAX_DISPLACEMENT_SQUARED", &mut layout.max_displacement_squared)?;
        override_from(&lookup, "QF_UPDATE_INTERVAL", &mut layout.update_interval)?;
        override_from(&lookup, "QF_ITERATIONS_PER_UPDATE", &mut self.iterations_per_update)?;
        override_from(&lookup, "QF_TIMEOUT_SECS", &mut self.timeout_secs)?;
        Ok(())
    }

    /// Check run settings and simulation tunables.
    pub fn validate(&self) -> Result<()> {
        if self.iterations_per_update == 0 {
            anyhow::bail!("iterations_per_update must be at least 1");
        }
        self.timeout()?;
        self.layout.validate()?;
        Ok(())
    }

    /// `timeout_secs` as a [`Duration`]; must be positive and representable.
    pub fn timeout(&self) -> Result<Duration> {
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            anyhow::bail!("timeout_secs must be a positive number, got {}", self.timeout_secs);
        }
        Duration::try_from_secs_f64(self.timeout_secs)
            .with_context(|| format!("timeout_secs is out of range: {}", self.timeout_secs))
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qf.json");
        std::fs::write(&path, r#"{ "delta_t": 0.05, "timeout_secs": 2.5 }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.layout.delta_t, 0.05);
        assert_eq!(config.timeout_secs, 2.5);
        assert_eq!(config.layout.spring_rest_length, 50.0);
        assert_eq!(config.iterations_per_update, 10);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config {
            timeout_secs: 2.5,
            ..Config::default()
        };
        config
            .apply_env(env(&[("QF_TIMEOUT_SECS", "7"), ("QF_SPRING_CONSTANT", " 2.5 ")]))
            .unwrap();

        assert_eq!(config.timeout_secs, 7.0);
        assert_eq!(config.layout.spring_constant, 2.5);
        assert_eq!(config.layout.delta_t, 0.02);
    }

    #[test]
    fn invalid_env_value_names_the_variable() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("QF_ITERATIONS_PER_UPDATE", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("QF_ITERATIONS_PER_UPDATE"));
    }

    #[test]
    fn validate_rejects_bad_run_settings() {
        let zero_iterations = Config {
            iterations_per_update: 0,
            ..Config::default()
        };
        assert!(zero_iterations.validate().is_err());

        let negative_timeout = Config {
            timeout_secs: -1.0,
            ..Config::default()
        };
        assert!(negative_timeout.validate().is_err());

        let huge_timeout = Config {
            timeout_secs: 1e300,
            ..Config::default()
        };
        let err = huge_timeout.validate().unwrap_err();
        assert!(err.to_string().contains("out of range"));

        assert!(Config::default().validate().is_ok());
        assert_eq!(Config::default().timeout().unwrap(), Duration::from_secs(30));
    }
}
