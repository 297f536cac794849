//! Vector helpers shared by the rope simulation.
//!
//! World space is Z-up. All helpers are tolerant of zero-length input and
//! never produce NaN.

use glam::Vec3;

/// Threshold below which lengths, durations and distances are treated as zero.
pub const KINDA_SMALL: f32 = 1.0e-4;

/// World up axis.
pub const UP: Vec3 = Vec3::Z;

/// Removes the component of `v` along the unit vector `axis`.
#[must_use]
pub fn project_out(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

/// Flattens a vector onto the horizontal plane.
#[must_use]
pub fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, 0.0)
}

/// Returns `(direction, length)` of `v`, or `None` when `v` is degenerate.
#[must_use]
pub fn split(v: Vec3) -> Option<(Vec3, f32)> {
    let len = v.length();
    if len <= KINDA_SMALL {
        None
    } else {
        Some((v / len, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_out_removes_axis_component() {
        let v = Vec3::new(3.0, 4.0, 5.0);
        let out = project_out(v, Vec3::Z);
        assert_eq!(out, Vec3::new(3.0, 4.0, 0.0));
        assert!(out.dot(Vec3::Z).abs() < 1e-6);
    }

    #[test]
    fn test_planar() {
        assert_eq!(planar(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_split_degenerate() {
        assert!(split(Vec3::ZERO).is_none());
        assert!(split(Vec3::splat(1.0e-6)).is_none());

        let (dir, len) = split(Vec3::new(0.0, 0.0, -10.0)).expect("non-degenerate");
        assert_eq!(len, 10.0);
        assert_eq!(dir, Vec3::NEG_Z);
    }
}
