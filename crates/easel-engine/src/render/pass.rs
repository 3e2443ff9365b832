use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::paint::Color;

/// Which pipeline a drawable renders with.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ShaderKind {
    /// Unlit vertex colors (2D shapes).
    #[default]
    Flat,
    /// Vertex colors with a single directional light (3D solids).
    Lit,
}

/// Primitive assembly for a vertex run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    #[default]
    TriangleList,
    LineList,
}

impl Topology {
    /// Vertices per primitive.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            Topology::TriangleList => 3,
            Topology::LineList => 2,
        }
    }
}

/// GPU-layout vertex: position, straight RGBA color, normal.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
}

impl Vertex {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, color: Color) -> Self {
        Self {
            position: [x, y, z],
            color: color.to_array(),
            normal: [0.0; 3],
        }
    }

    #[inline]
    pub fn color(&self) -> Color {
        let [r, g, b, a] = self.color;
        Color::new(r, g, b, a)
    }
}

/// Matrices handed to a drawable for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawTransform {
    /// camera × model.
    pub mvp: Mat4,
    pub model: Mat4,
    pub view: Mat4,
}

impl DrawTransform {
    /// Composes the per-object transform from the frame's camera matrices.
    #[inline]
    pub fn new(camera: Mat4, view: Mat4, model: Mat4) -> Self {
        Self { mvp: camera * model, model, view }
    }
}

/// Per-object render failure. Caught at the render-loop boundary and logged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("{count} vertices do not form whole {topology:?} primitives")]
    InvalidVertexCount { topology: Topology, count: usize },

    #[error("backend rejected draw: {0}")]
    Backend(String),

    #[error("{0}")]
    Other(String),
}

/// Ambient term of the single-light model used by [`ShaderKind::Lit`].
pub const AMBIENT: f32 = 0.3;

/// Direction towards the light, in world space (not normalized).
pub const LIGHT_DIR: [f32; 3] = [0.25, 0.5, 1.0];

/// Diffuse factor for a world-space normal. Mirrored by `shaders/mesh.wgsl`.
pub fn lambert(normal: Vec3) -> f32 {
    let l = Vec3::from(LIGHT_DIR).normalize();
    AMBIENT + (1.0 - AMBIENT) * normal.normalize_or_zero().dot(l).max(0.0)
}

/// Submission surface a drawable renders into.
///
/// Implemented by each backend; drawables only ever see this trait.
pub trait DrawPass {
    fn draw(
        &mut self,
        topology: Topology,
        shader: ShaderKind,
        transform: &DrawTransform,
        vertices: &[Vertex],
    ) -> Result<(), RenderError>;
}

/// Validates that `count` vertices form whole primitives.
pub fn check_vertex_count(topology: Topology, count: usize) -> Result<(), RenderError> {
    if count % topology.stride() == 0 {
        Ok(())
    } else {
        Err(RenderError::InvalidVertexCount { topology, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mvp_is_camera_times_model() {
        let camera = Mat4::from_scale(Vec3::splat(2.0));
        let model = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let xf = DrawTransform::new(camera, Mat4::IDENTITY, model);
        let p = xf.mvp.transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn lambert_is_bounded_by_ambient_and_one() {
        let lit = lambert(Vec3::from(LIGHT_DIR));
        assert!((lit - 1.0).abs() < 1e-5);
        assert_eq!(lambert(-Vec3::from(LIGHT_DIR)), AMBIENT);
        assert_eq!(lambert(Vec3::ZERO), AMBIENT);
    }

    #[test]
    fn vertex_count_must_fill_primitives() {
        assert!(check_vertex_count(Topology::TriangleList, 6).is_ok());
        assert!(check_vertex_count(Topology::LineList, 4).is_ok());
        assert_eq!(
            check_vertex_count(Topology::TriangleList, 4),
            Err(RenderError::InvalidVertexCount { topology: Topology::TriangleList, count: 4 })
        );
    }
}
