//! Pose types and conversion from tracking-service to consumer conventions

use serde::{Deserialize, Serialize};

/// Divisor applied to every service position axis before publishing
pub const DISTANCE_DIVISOR: f64 = 100.0;

/// Position as reported by the tracking service
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Unit quaternion, (w, x, y, z) on both sides of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pose in the consumer's convention
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation (x, y, z) after rescaling
    pub translation: [f64; 3],
    pub rotation: Quaternion,
}

/// Convert a service position/orientation into a consumer pose.
///
/// Each position axis is divided by [`DISTANCE_DIVISOR`]; the orientation is
/// passed through untouched. Any handedness or axis correction belongs here.
pub fn to_consumer_pose(position: Vector3, orientation: Quaternion) -> Pose {
    Pose {
        translation: [
            f64::from(position.x) / DISTANCE_DIVISOR,
            f64::from(position.y) / DISTANCE_DIVISOR,
            f64::from(position.z) / DISTANCE_DIVISOR,
        ],
        rotation: orientation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_scaled_per_axis() {
        let pose = to_consumer_pose(Vector3::new(150.0, -20.0, 0.0), Quaternion::IDENTITY);
        assert_eq!(pose.translation, [1.5, -0.2, 0.0]);
    }

    #[test]
    fn test_position_reversible() {
        let position = Vector3::new(12.5, 300.0, -7.25);
        let pose = to_consumer_pose(position, Quaternion::IDENTITY);
        let back = pose.translation.map(|v| v * DISTANCE_DIVISOR);
        for (got, want) in back.iter().zip([12.5, 300.0, -7.25]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_orientation_passthrough() {
        let q = Quaternion::new(0.5, -0.5, 0.5, -0.5);
        let pose = to_consumer_pose(Vector3::default(), q);
        assert_eq!(pose.rotation, q);
    }
}
