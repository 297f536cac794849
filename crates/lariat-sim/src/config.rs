//! Sim configuration.
//!
//! Provides the tick rate, run length, spawn point, scene and the tuning
//! tables for the rope and the kinematic character. Configuration can be
//! loaded from and saved to a TOML file.

use glam::Vec3;
use lariat_common::{ConfigError, LariatResult};
use lariat_gameplay::config::RopeConfig;
use lariat_gameplay::kinematic::KinematicConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::world::ScenePreset;

/// Configuration file name.
pub const CONFIG_FILE: &str = "lariat.toml";

/// Sim configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Fixed ticks per second
    pub tick_rate: u32,
    /// Seconds of simulated time to run
    pub duration: f32,

    // === Session ===
    /// Character spawn position
    pub spawn: Vec3,
    /// Scenario file (None = built-in demo)
    pub scenario: Option<PathBuf>,
    /// Capacity of the rope event queue
    pub event_capacity: usize,
    /// Print the final report as JSON on stdout
    pub report_json: bool,

    // === Tables ===
    /// World layout
    pub scene: ScenePreset,
    /// Rope tuning
    pub rope: RopeConfig,
    /// Character movement tuning
    pub character: KinematicConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            duration: 6.0,

            spawn: Vec3::new(0.0, 0.0, 88.0),
            scenario: None,
            event_capacity: 1024,
            report_json: false,

            scene: ScenePreset::default(),
            rope: RopeConfig::default(),
            character: KinematicConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        config.validate();
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration from a path named on the command line.
    ///
    /// Unlike [`Self::load_from`], a missing or malformed file is an error
    /// and timing values that cannot drive a run are rejected, not clamped.
    pub fn load_strict<P: AsRef<Path>>(path: P) -> LariatResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config =
            toml::from_str::<Self>(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.check()?;
        config.validate();
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Rejects values that [`Self::validate`] would otherwise rewrite.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_rate",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ConfigError::Invalid {
                field: "duration",
                reason: format!("{} is not a usable run length", self.duration),
            });
        }
        if !self.spawn.is_finite() {
            return Err(ConfigError::Invalid {
                field: "spawn",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 480);
        if !self.duration.is_finite() {
            self.duration = Self::default().duration;
        }
        self.duration = self.duration.clamp(0.0, 3600.0);
        if !self.spawn.is_finite() {
            self.spawn = Self::default().spawn;
        }
        self.event_capacity = self.event_capacity.max(16);

        self.rope.validate();
        self.character.half_height = self.character.half_height.max(1.0);
        self.character.radius = self
            .character
            .radius
            .clamp(1.0, self.character.half_height);
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Number of ticks needed to cover `duration`.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (f64::from(self.duration) * f64::from(self.tick_rate)).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lariat_common::LariatError;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.total_ticks(), 360);
        assert!(config.scenario.is_none());
        assert_eq!(config.rope.max_length, 1200.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();

        config.tick_rate = 1;
        config.duration = -5.0;
        config.event_capacity = 0;
        config.character.radius = 500.0;

        config.validate();

        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.duration, 0.0);
        assert_eq!(config.event_capacity, 16);
        assert_eq!(config.character.radius, config.character.half_height);
        assert!((config.fixed_dt() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("lariat.toml");

        let mut config = SimConfig::default();
        config.tick_rate = 120;
        config.spawn = Vec3::new(10.0, 20.0, 300.0);
        config.scenario = Some(PathBuf::from("scenarios/courtyard.json"));
        config.scene = ScenePreset::Gallery;
        config.rope.max_length = 900.0;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.tick_rate, 120);
        assert_eq!(loaded.spawn, Vec3::new(10.0, 20.0, 300.0));
        assert_eq!(
            loaded.scenario,
            Some(PathBuf::from("scenarios/courtyard.json"))
        );
        assert_eq!(loaded.scene.name(), "gallery");
        assert_eq!(loaded.rope.max_length, 900.0);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/lariat.toml");
        assert_eq!(config.tick_rate, 60);
    }

    #[test]
    fn test_config_partial_toml() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("lariat.toml");
        fs::write(
            &config_path,
            "duration = 2.5\n\n[rope]\nthrow_speed = 1200.0\n",
        )
        .expect("write");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.duration, 2.5);
        assert_eq!(loaded.tick_rate, 60);
        assert_eq!(loaded.rope.throw_speed, 1200.0);
        assert_eq!(loaded.rope.max_length, 1200.0);
    }

    #[test]
    fn test_strict_load_reports_errors() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("lariat.toml");

        let err = SimConfig::load_strict(&config_path).unwrap_err();
        assert!(matches!(err, LariatError::Io(_)));

        fs::write(&config_path, "tick_rate = \"fast\"").expect("write");
        let err = SimConfig::load_strict(&config_path).unwrap_err();
        assert!(matches!(err, LariatError::Config(ConfigError::Parse(_))));

        fs::write(&config_path, "tick_rate = 0").expect("write");
        let err = SimConfig::load_strict(&config_path).unwrap_err();
        assert!(matches!(
            err,
            LariatError::Config(ConfigError::Invalid {
                field: "tick_rate",
                ..
            })
        ));

        fs::write(&config_path, "tick_rate = 30\nduration = 1.5\n").expect("write");
        let config = SimConfig::load_strict(&config_path).expect("valid config");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.total_ticks(), 45);
    }

    #[test]
    fn test_config_invalid_toml_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("lariat.toml");
        fs::write(&config_path, "tick_rate = \"fast\"").expect("write");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.tick_rate, 60);
    }
}
