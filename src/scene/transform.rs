//! Placement of scene entities and debug shapes

use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Transform mapping the unit +X segment onto `start..end`
    pub fn segment(start: Vec3, end: Vec3) -> Self {
        let delta = end - start;
        let length = delta.length();
        let rotation = if length > f32::EPSILON {
            Quat::from_rotation_arc(Vec3::X, delta / length)
        } else {
            Quat::IDENTITY
        };
        Self {
            position: start,
            rotation,
            scale: Vec3::splat(length),
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Model matrix uploaded with each draw
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_maps_unit_line() {
        let start = Vec3::new(1.0, 2.0, 3.0);
        let end = Vec3::new(4.0, -2.0, 3.0);
        let matrix = Transform::segment(start, end).matrix();
        assert!((matrix.transform_point3(Vec3::ZERO) - start).length() < 1e-5);
        assert!((matrix.transform_point3(Vec3::X) - end).length() < 1e-4);
    }

    #[test]
    fn test_zero_length_segment_collapses() {
        let point = Vec3::new(0.5, 0.5, 0.5);
        let matrix = Transform::segment(point, point).matrix();
        assert_eq!(matrix.transform_point3(Vec3::X), point);
    }
}
