//! Shadow-casting light

use glam::{Mat4, Vec3};

/// Directional light (like the sun) with the volume its shadow map covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Half-size of the orthographic shadow volume
    pub shadow_extent: f32,
    /// Distance from the focus point back to the light's eye
    pub shadow_distance: f32,
    pub shadow_near: f32,
    pub shadow_far: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5).normalize(),
            color: Vec3::ONE,
            intensity: 1.0,
            shadow_extent: 35.0,
            shadow_distance: 40.0,
            shadow_near: 0.1,
            shadow_far: 75.0,
        }
    }
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize(),
            color,
            intensity,
            ..Default::default()
        }
    }

    /// Projection * view of the shadow volume centered on `focus`
    pub fn light_space_matrix(&self, focus: Vec3) -> Mat4 {
        let direction = self.direction.normalize_or_zero();
        let eye = focus - direction * self.shadow_distance;
        let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(eye, focus, up);
        let e = self.shadow_extent;
        let projection = Mat4::orthographic_rh(-e, e, -e, e, self.shadow_near, self.shadow_far);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_projects_into_volume() {
        let light = DirectionalLight::default();
        let clip = light
            .light_space_matrix(Vec3::ZERO)
            .project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&clip.z));
    }

    #[test]
    fn test_straight_down_light_is_finite() {
        let light = DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 1.0);
        assert!(light.light_space_matrix(Vec3::ZERO).is_finite());
    }
}
