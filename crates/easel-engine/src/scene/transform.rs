use glam::{Mat4, Vec3};

/// Accumulating translate/rotate/scale state of a drawable.
///
/// Each operation composes onto the current matrix of its kind; the model matrix
/// is always `translate * rotate * scale`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    translate: Mat4,
    rotate: Mat4,
    scale: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translate: Mat4::IDENTITY,
            rotate: Mat4::IDENTITY,
            scale: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    pub fn translate(&mut self, delta: Vec3) {
        self.translate *= Mat4::from_translation(delta);
    }

    /// Rotates by `degrees` around `axis`. A zero axis is ignored.
    pub fn rotate(&mut self, degrees: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else { return };
        self.rotate *= Mat4::from_axis_angle(axis, degrees.to_radians());
    }

    pub fn scale(&mut self, factors: Vec3) {
        self.scale *= Mat4::from_scale(factors);
    }

    pub fn reset_translation(&mut self) {
        self.translate = Mat4::IDENTITY;
    }

    pub fn reset_rotation(&mut self) {
        self.rotate = Mat4::IDENTITY;
    }

    pub fn reset_scale(&mut self) {
        self.scale = Mat4::IDENTITY;
    }

    pub fn translation(&self) -> Vec3 {
        self.translate.w_axis.truncate()
    }

    pub fn scale_factors(&self) -> Vec3 {
        Vec3::new(self.scale.x_axis.x, self.scale.y_axis.y, self.scale.z_axis.z)
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.translate * self.rotate * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn translations_accumulate() {
        let mut t = Transform::default();
        t.translate(Vec3::new(1.0, 2.0, 0.0));
        t.translate(Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(t.translation(), Vec3::new(2.0, 2.0, 3.0));
        t.reset_translation();
        assert_eq!(t.translation(), Vec3::ZERO);
    }

    #[test]
    fn model_scales_then_rotates_then_translates() {
        let mut t = Transform::default();
        t.scale(Vec3::splat(2.0));
        t.rotate(90.0, Vec3::Z);
        t.translate(Vec3::new(10.0, 0.0, 0.0));

        let p = t.model_matrix().transform_point3(Vec3::X);
        assert!(approx(p, Vec3::new(10.0, 2.0, 0.0)), "{p:?}");
    }

    #[test]
    fn zero_axis_rotation_is_ignored() {
        let mut t = Transform::default();
        t.rotate(45.0, Vec3::ZERO);
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn scale_factors_report_diagonal() {
        let mut t = Transform::default();
        t.scale(Vec3::new(2.0, 3.0, 4.0));
        t.scale(Vec3::new(0.5, 1.0, 1.0));
        assert_eq!(t.scale_factors(), Vec3::new(1.0, 3.0, 4.0));
    }
}
