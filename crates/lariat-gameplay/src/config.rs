//! Rope tuning parameters.
//!
//! Every threshold the rope core uses is designer-tunable. Values are in
//! world units (centimetres) and seconds. Configuration can be loaded from
//! and saved to a TOML file.

use lariat_common::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Rope tuning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RopeConfig {
    // === Length ===
    /// Maximum rope reach
    pub max_length: f32,
    /// Shortest rope length allowed while holding or hanging
    pub climb_min_length: f32,
    /// Radius around the anchor inside which ledge assist may run
    pub anchor_assist_distance: f32,
    /// Extra tolerance added to the assist band
    pub anchor_assist_slack: f32,

    // === Throw ===
    /// Rope projectile speed
    pub throw_speed: f32,
    /// Arc height as a fraction of throw distance
    pub arc_height_factor: f32,
    /// Lower bound for the throw arc height
    pub arc_height_min: f32,
    /// Upper bound for the throw arc height
    pub arc_height_max: f32,

    // === Recall ===
    /// Seconds of recall before the rope returns to the player
    pub recall_hold_seconds: f32,
    /// Retraction speed while recalling
    pub recall_retract_speed: f32,

    // === Swing ===
    /// Tangential acceleration applied per unit of swing input
    pub swing_acceleration: f32,
    /// Velocity damping rate per second
    pub swing_damping: f32,
    /// Damping multiplier used when no swing input is present
    pub idle_damping_multiplier: f32,

    // === Climb ===
    /// Climb speed along the rope
    pub climb_speed: f32,
    /// Tolerance for treating the rope as fully paid out
    pub climb_max_snap: f32,

    // === Ledge assist ===
    /// Minimum dot between hit normal and anchor normal for a valid ledge
    pub ledge_normal_dot_threshold: f32,
    /// Minimum normal Z for a surface to count as an upward-facing ledge
    pub ledge_upward_normal_z: f32,
    /// Minimum normal Z for a floor to count as standable
    pub standable_normal_z: f32,
    /// Maximum distance from the anchor at which the loose rope can be grabbed
    pub grab_distance: f32,
    /// Sphere radius of the ledge probe
    pub ledge_probe_radius: f32,
    /// Height above the anchor at which the ledge probe starts
    pub ledge_probe_lift: f32,
    /// Distance the ledge probe sweeps downward
    pub ledge_probe_depth: f32,
    /// Blend between current position (0) and the ledge target (1)
    pub ledge_assist_strength: f32,
    /// Distance the stand position is pushed away from the ledge edge
    pub ledge_stand_off_distance: f32,
    /// Extra height added to the stand position
    pub ledge_vertical_offset: f32,
    /// Minimum seconds between two ledge climbs
    pub ledge_climb_cooldown_seconds: f32,

    // === Ground contact ===
    /// Floor distance under which hanging ends (0 disables)
    pub ground_exit_proximity: f32,
    /// Run the ground-contact exit before a held-climb ledge attempt
    pub ground_exit_before_ledge: bool,
    /// Floor clearance under which a swinging character touches down
    pub ground_contact_tolerance: f32,

    // === Tension ===
    /// Slack tolerated when deciding whether a freshly held rope is taut
    pub taut_tolerance: f32,
    /// Slack tolerated when the tether decides the rope is taut
    pub tether_taut_tolerance: f32,

    // === Release ===
    /// Launch speed along current velocity on a jump release
    pub release_launch_speed: f32,
    /// Launch speed along facing on a jump release
    pub release_forward_speed: f32,

    // === Debug ===
    /// Emit debug shapes to the diagnostics sink
    pub debug_draw: bool,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            // Length
            max_length: 1200.0,
            climb_min_length: 0.0,
            anchor_assist_distance: 120.0,
            anchor_assist_slack: 8.0,

            // Throw
            throw_speed: 2400.0,
            arc_height_factor: 0.25,
            arc_height_min: 120.0,
            arc_height_max: 600.0,

            // Recall
            recall_hold_seconds: 1.0,
            recall_retract_speed: 2600.0,

            // Swing
            swing_acceleration: 600.0,
            swing_damping: 0.05,
            idle_damping_multiplier: 2.0,

            // Climb
            climb_speed: 200.0,
            climb_max_snap: 0.5,

            // Ledge assist
            ledge_normal_dot_threshold: 0.45,
            ledge_upward_normal_z: 0.55,
            standable_normal_z: 0.85,
            grab_distance: 140.0,
            ledge_probe_radius: 50.0,
            ledge_probe_lift: 20.0,
            ledge_probe_depth: 200.0,
            ledge_assist_strength: 0.9,
            ledge_stand_off_distance: 28.0,
            ledge_vertical_offset: 0.0,
            ledge_climb_cooldown_seconds: 0.35,

            // Ground contact
            ground_exit_proximity: 0.0,
            ground_exit_before_ledge: true,
            ground_contact_tolerance: 2.4,

            // Tension
            taut_tolerance: 1.0,
            tether_taut_tolerance: 1.5,

            // Release
            release_launch_speed: 200.0,
            release_forward_speed: 200.0,

            debug_draw: false,
        }
    }
}

impl RopeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    /// Serializes the configuration to TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Rope config not found at {}, using defaults", path.display());
            return Self::default();
        }

        let mut contents = String::new();
        match fs::File::open(path) {
            Ok(mut file) => {
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read rope config: {e}");
                    return Self::default();
                }
            },
            Err(e) => {
                warn!("Failed to open rope config: {e}");
                return Self::default();
            },
        }

        match Self::from_toml_str(&contents) {
            Ok(config) => {
                info!("Loaded rope config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("{e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = self
            .to_toml_string()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved rope config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to usable ranges.
    pub fn validate(&mut self) {
        self.max_length = self.max_length.max(1.0);
        self.climb_min_length = self.climb_min_length.clamp(0.0, self.max_length);
        self.anchor_assist_distance = self.anchor_assist_distance.max(0.0);
        self.anchor_assist_slack = self.anchor_assist_slack.max(0.0);

        self.throw_speed = self.throw_speed.max(1.0);
        self.arc_height_min = self.arc_height_min.max(0.0);
        self.arc_height_max = self.arc_height_max.max(self.arc_height_min);

        self.recall_retract_speed = self.recall_retract_speed.max(0.0);
        self.swing_damping = self.swing_damping.max(0.0);
        self.idle_damping_multiplier = self.idle_damping_multiplier.max(1.0);
        self.climb_speed = self.climb_speed.max(0.0);
        self.climb_max_snap = self.climb_max_snap.max(0.0);

        self.ledge_normal_dot_threshold = self.ledge_normal_dot_threshold.clamp(-1.0, 1.0);
        self.ledge_upward_normal_z = self.ledge_upward_normal_z.clamp(-1.0, 1.0);
        self.standable_normal_z = self.standable_normal_z.clamp(-1.0, 1.0);
        self.grab_distance = self.grab_distance.max(0.0);
        self.ledge_probe_radius = self.ledge_probe_radius.max(0.0);
        self.ledge_probe_depth = self.ledge_probe_depth.max(0.0);
        self.ledge_assist_strength = self.ledge_assist_strength.clamp(0.0, 1.0);
        self.ledge_stand_off_distance = self.ledge_stand_off_distance.max(0.0);
        self.ledge_climb_cooldown_seconds = self.ledge_climb_cooldown_seconds.max(0.0);

        self.ground_exit_proximity = self.ground_exit_proximity.max(0.0);
        self.ground_contact_tolerance = self.ground_contact_tolerance.max(0.0);
        self.taut_tolerance = self.taut_tolerance.max(0.0);
        self.tether_taut_tolerance = self.tether_taut_tolerance.max(0.0);
    }

    /// Length floor while the player holds or hangs from the rope.
    #[must_use]
    pub fn climb_floor(&self) -> f32 {
        self.climb_min_length.max(0.0)
    }

    /// Radius of the anchor-assist band, including slack.
    #[must_use]
    pub fn assist_band(&self) -> f32 {
        self.anchor_assist_distance.max(0.0) + self.anchor_assist_slack
    }

    /// Arc height of a throw covering `distance`.
    #[must_use]
    pub fn arc_height(&self, distance: f32) -> f32 {
        (distance * self.arc_height_factor).clamp(self.arc_height_min, self.arc_height_max)
    }
}
