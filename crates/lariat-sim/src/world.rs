//! Demo scenes for the headless sim.
//!
//! Each preset builds a [`StaticScene`] laid out around the origin with Z up
//! and units in centimetres. A config may also carry a custom scene inline.

use glam::Vec3;
use lariat_gameplay::geometry::StaticScene;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Height of the overhang underside in the courtyard.
pub const OVERHANG_HEIGHT: f32 = 600.0;

/// Scene the sim runs in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenePreset {
    /// Ground, an overhang to swing from, a ledge block and a tall wall
    #[default]
    Courtyard,
    /// A ceiling slab with no ground below
    Gallery,
    /// Flat ground only
    Flat,
    /// Solids listed in the config
    Custom {
        /// The scene itself
        scene: StaticScene,
    },
}

impl ScenePreset {
    /// Builds the scene.
    #[must_use]
    pub fn build(&self) -> StaticScene {
        let scene = match self {
            Self::Courtyard => courtyard(),
            Self::Gallery => gallery(),
            Self::Flat => {
                let mut scene = StaticScene::new();
                scene.add_ground(0.0);
                scene
            },
            Self::Custom { scene } => scene.clone(),
        };
        debug!(preset = self.name(), solids = scene.len(), "scene built");
        scene
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Courtyard => "courtyard",
            Self::Gallery => "gallery",
            Self::Flat => "flat",
            Self::Custom { .. } => "custom",
        }
    }
}

/// Ground with an overhang above the spawn, a ledge block to mount and a
/// tall wall further out.
#[must_use]
pub fn courtyard() -> StaticScene {
    let mut scene = StaticScene::new();
    scene.add_ground(0.0);
    scene.add_box(
        Vec3::new(-400.0, -400.0, OVERHANG_HEIGHT),
        Vec3::new(400.0, 400.0, OVERHANG_HEIGHT + 100.0),
    );
    scene.add_box(Vec3::new(800.0, -300.0, 0.0), Vec3::new(1100.0, 300.0, 300.0));
    scene.add_box(Vec3::new(1500.0, -600.0, 0.0), Vec3::new(1600.0, 600.0, 900.0));
    scene
}

/// A wide ceiling slab at 800 with nothing underneath.
#[must_use]
pub fn gallery() -> StaticScene {
    let mut scene = StaticScene::new();
    scene.add_box(
        Vec3::new(-2000.0, -2000.0, 800.0),
        Vec3::new(2000.0, 2000.0, 900.0),
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use lariat_gameplay::geometry::GeometryQuery;

    #[test]
    fn test_courtyard_overhang_above_spawn() {
        let scene = courtyard();
        let hit = scene
            .line_trace(Vec3::new(0.0, 0.0, 88.0), Vec3::new(0.0, 0.0, 2000.0))
            .expect("overhang");
        assert!((hit.point.z - OVERHANG_HEIGHT).abs() < 1e-3);
        assert_eq!(hit.normal, Vec3::NEG_Z);
    }

    #[test]
    fn test_gallery_has_no_ground() {
        let scene = gallery();
        assert!(scene
            .line_trace(Vec3::ZERO, Vec3::new(0.0, 0.0, -5000.0))
            .is_none());
    }

    #[test]
    fn test_preset_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            scene: ScenePreset,
        }

        let wrapper: Wrapper = toml::from_str("scene = { kind = \"flat\" }").expect("parse");
        assert_eq!(wrapper.scene.name(), "flat");
        assert_eq!(wrapper.scene.build().len(), 1);
    }
}
