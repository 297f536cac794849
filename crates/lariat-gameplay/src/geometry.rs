//! World geometry queries used by the rope core.
//!
//! The rope never owns collision data. It issues synchronous, read-only
//! queries through [`GeometryQuery`] against whatever world snapshot the
//! host provides for the current tick. [`StaticScene`] is a small
//! box-and-plane world that implements the trait for the headless sim and
//! for tests.

use glam::Vec3;
use lariat_common::SolidId;
use serde::{Deserialize, Serialize};

/// Result of a line trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// Impact point on the surface
    pub point: Vec3,
    /// Surface normal at the impact point
    pub normal: Vec3,
    /// Distance travelled from the trace start
    pub distance: f32,
    /// Solid that was hit
    pub solid: SolidId,
}

/// Result of a sphere sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Sphere centre at the moment of impact
    pub location: Vec3,
    /// Contact point on the surface
    pub point: Vec3,
    /// Surface normal at the contact point
    pub normal: Vec3,
    /// Fraction of the sweep completed before the block (0.0 to 1.0)
    pub fraction: f32,
    /// Solid that was hit
    pub solid: SolidId,
}

/// Collision query interface for the rope core.
///
/// Queries are filtered to visibility-blocking solid geometry and never
/// report the owning character.
pub trait GeometryQuery {
    /// Traces a segment and returns the first blocking hit.
    fn line_trace(&self, start: Vec3, end: Vec3) -> Option<TraceHit>;

    /// Sweeps a sphere along a segment and returns the first blocking hit.
    fn sweep_sphere(&self, start: Vec3, end: Vec3, radius: f32) -> Option<SweepHit>;

    /// Checks whether a sphere placed at `center` overlaps solid geometry.
    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool;
}

/// A solid in a [`StaticScene`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Solid {
    /// Axis-aligned box
    Box {
        /// Minimum corner
        min: Vec3,
        /// Maximum corner
        max: Vec3,
    },
    /// Infinite ground; everything below `height` is solid
    Ground {
        /// Height of the ground surface
        height: f32,
    },
}

impl Solid {
    /// Creates a box from its centre and half extents.
    #[must_use]
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::Box {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Grows the solid by `margin` on every side.
    fn inflated(self, margin: f32) -> Self {
        match self {
            Self::Box { min, max } => Self::Box {
                min: min - Vec3::splat(margin),
                max: max + Vec3::splat(margin),
            },
            Self::Ground { height } => Self::Ground {
                height: height + margin,
            },
        }
    }

    /// Intersects the segment `start + delta * t`, `t` in `[0, 1]`.
    ///
    /// Segments that start inside the solid do not hit it.
    fn raycast(self, start: Vec3, delta: Vec3) -> Option<(f32, Vec3)> {
        match self {
            Self::Box { min, max } => {
                let mut t_enter = 0.0_f32;
                let mut t_exit = 1.0_f32;
                let mut normal = Vec3::ZERO;

                for axis in 0..3 {
                    let s = start[axis];
                    let d = delta[axis];
                    if d.abs() < 1.0e-8 {
                        if s < min[axis] || s > max[axis] {
                            return None;
                        }
                        continue;
                    }

                    let mut face = Vec3::ZERO;
                    let (t_near, t_far) = if d > 0.0 {
                        face[axis] = -1.0;
                        ((min[axis] - s) / d, (max[axis] - s) / d)
                    } else {
                        face[axis] = 1.0;
                        ((max[axis] - s) / d, (min[axis] - s) / d)
                    };

                    if t_near > t_enter {
                        t_enter = t_near;
                        normal = face;
                    }
                    t_exit = t_exit.min(t_far);
                    if t_enter > t_exit {
                        return None;
                    }
                }

                // No entering face means the segment started inside.
                (normal != Vec3::ZERO).then_some((t_enter, normal))
            },
            Self::Ground { height } => {
                let end_z = start.z + delta.z;
                if start.z < height || end_z >= height {
                    return None;
                }
                let t = (start.z - height) / (start.z - end_z);
                Some((t, Vec3::Z))
            },
        }
    }

    fn overlaps_sphere(self, center: Vec3, radius: f32) -> bool {
        match self {
            Self::Box { min, max } => {
                let closest = center.clamp(min, max);
                closest.distance_squared(center) < radius * radius
            },
            Self::Ground { height } => center.z - radius < height,
        }
    }
}

/// A static world made of boxes and ground planes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticScene {
    solids: Vec<Solid>,
}

impl StaticScene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a solid and returns its id.
    pub fn add(&mut self, solid: Solid) -> SolidId {
        let id = SolidId::new(self.solids.len() as u32);
        self.solids.push(solid);
        id
    }

    /// Adds an infinite ground at `height`.
    pub fn add_ground(&mut self, height: f32) -> SolidId {
        self.add(Solid::Ground { height })
    }

    /// Adds an axis-aligned box from its corners.
    pub fn add_box(&mut self, min: Vec3, max: Vec3) -> SolidId {
        self.add(Solid::Box { min, max })
    }

    /// Returns the solid registered under `id`.
    #[must_use]
    pub fn solid(&self, id: SolidId) -> Option<&Solid> {
        self.solids.get(id.index())
    }

    /// Number of solids in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.solids.len()
    }

    /// Whether the scene has no solids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }

    fn first_hit(&self, start: Vec3, end: Vec3, margin: f32) -> Option<(f32, Vec3, SolidId)> {
        let delta = end - start;
        self.solids
            .iter()
            .enumerate()
            .filter_map(|(index, solid)| {
                solid
                    .inflated(margin)
                    .raycast(start, delta)
                    .map(|(t, normal)| (t, normal, SolidId::new(index as u32)))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

impl GeometryQuery for StaticScene {
    fn line_trace(&self, start: Vec3, end: Vec3) -> Option<TraceHit> {
        let (t, normal, solid) = self.first_hit(start, end, 0.0)?;
        let point = start.lerp(end, t);
        Some(TraceHit {
            point,
            normal,
            distance: start.distance(point),
            solid,
        })
    }

    fn sweep_sphere(&self, start: Vec3, end: Vec3, radius: f32) -> Option<SweepHit> {
        let (fraction, normal, solid) = self.first_hit(start, end, radius.max(0.0))?;
        let location = start.lerp(end, fraction);
        Some(SweepHit {
            location,
            point: location - normal * radius,
            normal,
            fraction,
            solid,
        })
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.solids
            .iter()
            .any(|solid| solid.overlaps_sphere(center, radius))
    }
}
