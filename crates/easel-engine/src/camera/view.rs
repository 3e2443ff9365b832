use glam::{Mat4, Vec3, Vec4};

/// Projection used for the whole canvas.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ViewMode {
    /// Orthographic box matching the window in pixels, top-left origin, +Y down.
    #[default]
    Flat2D,
    /// Perspective frustum around the eye/target pair.
    Perspective3D,
}

/// Pointer-drag flags sampled from input state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct CameraDrag {
    pub mouse_down: bool,
    pub shift_down: bool,
    pub ctrl_down: bool,
}

/// Matrices computed once per frame and shared by every drawable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    /// projection × view.
    pub camera: Mat4,
}

/// Eye/target camera with an optional pointer-driven orbit.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ViewMode,
    pub movement_enabled: bool,
}

impl Camera {
    const DRAG_SCALE: f32 = 10.0;

    pub fn new(mode: ViewMode) -> Self {
        let eye = match mode {
            ViewMode::Flat2D => Vec3::new(0.0, 0.0, 1.0),
            ViewMode::Perspective3D => Vec3::new(0.0, 0.0, 5.0),
        };

        Self {
            eye,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_deg: 45.0,
            near: 0.1,
            far: 100.0,
            mode,
            movement_enabled: false,
        }
    }

    /// Switches projection and resets the eye to that mode's default.
    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.mode != mode {
            let fresh = Camera::new(mode);
            self.eye = fresh.eye;
            self.target = fresh.target;
            self.mode = mode;
        }
    }

    pub fn set_perspective(&mut self, fov_deg: f32, near: f32, far: f32) {
        self.fov_deg = fov_deg;
        self.near = near;
        self.far = far;
    }

    /// Applies one frame of pointer drag. Only active in 3D with movement enabled.
    ///
    /// - mouse: pan eye and target in the view plane
    /// - mouse + shift: dolly along the view direction
    /// - mouse + ctrl: move the eye only, orbiting the target
    pub fn apply_drag(&mut self, dx: f32, dy: f32, drag: CameraDrag) {
        if self.mode != ViewMode::Perspective3D || !self.movement_enabled || !drag.mouse_down {
            return;
        }
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        let (dx, dy) = (dx / Self::DRAG_SCALE, dy / Self::DRAG_SCALE);

        if !drag.shift_down && !drag.ctrl_down {
            let diff = self.to_world(Vec4::new(dx, dy, 0.0, 0.0));
            self.eye += diff;
            self.target += diff;
        }

        if drag.shift_down {
            let diff = self.to_world(Vec4::new(0.0, 0.0, -dy, 0.0));
            self.eye += diff;
            self.target += diff;
        }

        if drag.ctrl_down {
            self.eye += self.to_world(Vec4::new(dx, dy, 0.0, 0.0));
        }
    }

    /// Maps a view-space offset into world space using the camera's orientation.
    fn to_world(&self, offset: Vec4) -> Vec3 {
        let Some(direction) = (self.target - self.eye).try_normalize() else {
            return Vec3::ZERO;
        };

        let orient = Mat4::look_at_rh(direction, Vec3::ZERO, self.up);
        (orient.transpose() * offset).truncate()
    }

    pub fn matrices(&self, width: u32, height: u32) -> CameraMatrices {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);

        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let projection = match self.mode {
            ViewMode::Flat2D => Mat4::orthographic_rh(0.0, w, h, 0.0, self.near, self.far),
            ViewMode::Perspective3D => {
                Mat4::perspective_rh(self.fov_deg.to_radians(), w / h, self.near, self.far)
            }
        };

        CameraMatrices { view, projection, camera: projection * view }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(ViewMode::Flat2D)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn flat_projection_maps_pixels_to_ndc() {
        let cam = Camera::new(ViewMode::Flat2D);
        let m = cam.matrices(400, 300).camera;

        let top_left = m.project_point3(Vec3::new(0.0, 0.0, 0.0));
        assert!(approx(top_left.truncate().extend(0.0), Vec3::new(-1.0, 1.0, 0.0)));

        let center = m.project_point3(Vec3::new(200.0, 150.0, 0.0));
        assert!(center.x.abs() < 1e-4 && center.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&center.z));
    }

    #[test]
    fn drag_is_ignored_in_flat_mode() {
        let mut cam = Camera::new(ViewMode::Flat2D);
        cam.movement_enabled = true;
        let before = cam.clone();
        cam.apply_drag(30.0, 10.0, CameraDrag { mouse_down: true, ..Default::default() });
        assert_eq!(cam, before);
    }

    #[test]
    fn pan_moves_eye_and_target_together() {
        let mut cam = Camera::new(ViewMode::Perspective3D);
        cam.movement_enabled = true;
        cam.apply_drag(10.0, 0.0, CameraDrag { mouse_down: true, ..Default::default() });

        let shift = cam.target - Vec3::ZERO;
        assert!(shift.length() > 0.5);
        assert!(approx(cam.eye - cam.target, Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn dolly_moves_along_view_axis() {
        let mut cam = Camera::new(ViewMode::Perspective3D);
        cam.movement_enabled = true;
        cam.apply_drag(0.0, 20.0, CameraDrag { mouse_down: true, shift_down: true, ctrl_down: false });

        assert!(approx(cam.eye - cam.target, Vec3::new(0.0, 0.0, 5.0)));
        assert!(cam.eye.x.abs() < 1e-4 && cam.eye.y.abs() < 1e-4);
        assert!((cam.eye.z - 5.0).abs() > 1.0);
    }

    #[test]
    fn ctrl_drag_moves_eye_only() {
        let mut cam = Camera::new(ViewMode::Perspective3D);
        cam.movement_enabled = true;
        cam.apply_drag(10.0, 0.0, CameraDrag { mouse_down: true, shift_down: false, ctrl_down: true });

        assert_eq!(cam.target, Vec3::ZERO);
        assert!(cam.eye.x.abs() > 0.5);
    }

    #[test]
    fn set_mode_resets_eye() {
        let mut cam = Camera::new(ViewMode::Flat2D);
        cam.set_mode(ViewMode::Perspective3D);
        assert_eq!(cam.eye, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(cam.mode, ViewMode::Perspective3D);
    }
}
