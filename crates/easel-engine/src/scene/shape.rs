use glam::{Mat4, Vec3};
use parking_lot::Mutex;

use crate::paint::Color;
use crate::render::{check_vertex_count, DrawPass, DrawTransform, RenderError, ShaderKind, Topology, Vertex};

use super::{Drawable, Layer, Transform};

/// Misuse of a [`Shape`]'s vertex storage. The shape is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("shape is full at {capacity} vertices")]
    Full { capacity: usize },

    #[error("vertex index {index} out of bounds ({len} vertices)")]
    OutOfBounds { index: usize, len: usize },
}

#[derive(Debug)]
struct ShapeState {
    transform: Transform,
    vertices: Vec<Vertex>,
    capacity: usize,
    layer: Option<Layer>,
}

/// General vertex-array drawable.
///
/// Every attribute lives behind the shape's own mutex, so application threads
/// can move or recolor a shape while the render thread draws other objects.
/// Geometry is stored in object space; placement goes through the transform.
#[derive(Debug)]
pub struct Shape {
    label: String,
    topology: Topology,
    shader: ShaderKind,
    state: Mutex<ShapeState>,
}

impl Shape {
    /// Creates an empty shape that accepts up to `capacity` vertices.
    pub fn new(label: impl Into<String>, topology: Topology, shader: ShaderKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            label: label.into(),
            topology,
            shader,
            state: Mutex::new(ShapeState {
                transform: Transform::default(),
                vertices: Vec::with_capacity(capacity),
                capacity,
                layer: None,
            }),
        }
    }

    /// Builds a shape whose capacity equals the given vertex list.
    pub fn from_vertices(
        label: impl Into<String>,
        topology: Topology,
        shader: ShaderKind,
        vertices: Vec<Vertex>,
    ) -> Self {
        let shape = Self::new(label, topology, shader, vertices.len());
        {
            let mut st = shape.state.lock();
            st.vertices = vertices;
            if topology == Topology::TriangleList {
                compute_normals(&mut st.vertices);
            }
        }
        shape
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    // ── transform ─────────────────────────────────────────────────────────

    pub fn translate(&self, x: f32, y: f32, z: f32) {
        self.state.lock().transform.translate(Vec3::new(x, y, z));
    }

    pub fn rotate(&self, degrees: f32, x: f32, y: f32, z: f32) {
        self.state.lock().transform.rotate(degrees, Vec3::new(x, y, z));
    }

    pub fn scale(&self, x: f32, y: f32, z: f32) {
        self.state.lock().transform.scale(Vec3::new(x, y, z));
    }

    pub fn reset_translation(&self) {
        self.state.lock().transform.reset_translation();
    }

    pub fn reset_rotation(&self) {
        self.state.lock().transform.reset_rotation();
    }

    pub fn reset_scale(&self) {
        self.state.lock().transform.reset_scale();
    }

    pub fn translation(&self) -> Vec3 {
        self.state.lock().transform.translation()
    }

    pub fn scale_factors(&self) -> Vec3 {
        self.state.lock().transform.scale_factors()
    }

    // ── vertices ──────────────────────────────────────────────────────────

    /// Recolors every initialized vertex.
    pub fn set_color(&self, color: Color) {
        let rgba = color.to_array();
        for v in self.state.lock().vertices.iter_mut() {
            v.color = rgba;
        }
    }

    /// Appends a vertex. Normals are recomputed whenever a triangle completes.
    pub fn add_vertex(&self, x: f32, y: f32, z: f32, color: Color) -> Result<(), ShapeError> {
        let mut st = self.state.lock();
        if st.vertices.len() >= st.capacity {
            return Err(ShapeError::Full { capacity: st.capacity });
        }

        st.vertices.push(Vertex::new(x, y, z, color));

        if self.topology == Topology::TriangleList && st.vertices.len() % 3 == 0 {
            compute_normals(&mut st.vertices);
        }
        Ok(())
    }

    pub fn vertex_position(&self, index: usize) -> Result<Vec3, ShapeError> {
        let st = self.state.lock();
        st.vertices
            .get(index)
            .map(|v| Vec3::from(v.position))
            .ok_or(ShapeError::OutOfBounds { index, len: st.vertices.len() })
    }

    pub fn vertex_count(&self) -> usize {
        self.state.lock().vertices.len()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Changes the vertex capacity, truncating initialized vertices that no longer fit.
    pub fn set_capacity(&self, capacity: usize) {
        let mut st = self.state.lock();
        st.capacity = capacity.max(1);
        let cap = st.capacity;
        st.vertices.truncate(cap);
    }

    /// Layer requested for the next `add`; already-added shapes keep their slot.
    pub fn set_layer(&self, layer: Option<Layer>) {
        self.state.lock().layer = layer;
    }
}

impl Drawable for Shape {
    fn model_matrix(&self) -> Mat4 {
        self.state.lock().transform.model_matrix()
    }

    fn render(&self, pass: &mut dyn DrawPass, transform: &DrawTransform) -> Result<(), RenderError> {
        let st = self.state.lock();

        // Incomplete trailing primitives are still being filled in by `add_vertex`.
        let whole = st.vertices.len() - st.vertices.len() % self.topology.stride();
        if whole == 0 {
            return Ok(());
        }
        check_vertex_count(self.topology, whole)?;

        pass.draw(self.topology, self.shader, transform, &st.vertices[..whole])
    }

    fn shader(&self) -> ShaderKind {
        self.shader
    }

    fn layer(&self) -> Option<Layer> {
        self.state.lock().layer
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Flat per-triangle normals.
fn compute_normals(vertices: &mut [Vertex]) {
    for tri in vertices.chunks_exact_mut(3) {
        let a = Vec3::from(tri[0].position);
        let b = Vec3::from(tri[1].position);
        let c = Vec3::from(tri[2].position);
        let n = (b - a).cross(c - a).normalize_or_zero().to_array();
        for v in tri.iter_mut() {
            v.normal = n;
        }
    }
}

// ── constructors ──────────────────────────────────────────────────────────

/// Perimeter points used by [`Shape::ellipse`] and [`Shape::circle`].
pub const ELLIPSE_SEGMENTS: usize = 48;

impl Shape {
    /// Axis-aligned rectangle centered at `(cx, cy)` in canvas pixels.
    pub fn rectangle(cx: f32, cy: f32, width: f32, height: f32, color: Color) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let corners = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
        let shape = Self::from_vertices("rectangle", Topology::TriangleList, ShaderKind::Flat, fan(&corners, color));
        shape.translate(cx, cy, 0.0);
        shape
    }

    pub fn triangle(a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Color) -> Self {
        let vertices = [a, b, c]
            .iter()
            .map(|&(x, y)| Vertex::new(x, y, 0.0, color))
            .collect();
        Self::from_vertices("triangle", Topology::TriangleList, ShaderKind::Flat, vertices)
    }

    /// Convex polygon, triangulated as a fan around the first point.
    pub fn polygon(points: &[(f32, f32)], color: Color) -> Self {
        Self::from_vertices("polygon", Topology::TriangleList, ShaderKind::Flat, fan(points, color))
    }

    /// Filled ellipse centered at `(cx, cy)` with radii `rx`, `ry`, built from
    /// [`ELLIPSE_SEGMENTS`] perimeter points.
    pub fn ellipse(cx: f32, cy: f32, rx: f32, ry: f32, color: Color) -> Self {
        let perimeter: Vec<_> = (0..ELLIPSE_SEGMENTS)
            .map(|i| {
                let a = i as f32 * std::f32::consts::TAU / ELLIPSE_SEGMENTS as f32;
                (rx * a.cos(), ry * a.sin())
            })
            .collect();
        let shape = Self::from_vertices("ellipse", Topology::TriangleList, ShaderKind::Flat, fan(&perimeter, color));
        shape.translate(cx, cy, 0.0);
        shape
    }

    pub fn circle(cx: f32, cy: f32, radius: f32, color: Color) -> Self {
        let mut shape = Self::ellipse(cx, cy, radius, radius, color);
        shape.label = "circle".into();
        shape
    }

    pub fn line(a: (f32, f32), b: (f32, f32), color: Color) -> Self {
        let vertices = vec![Vertex::new(a.0, a.1, 0.0, color), Vertex::new(b.0, b.1, 0.0, color)];
        Self::from_vertices("line", Topology::LineList, ShaderKind::Flat, vertices)
    }

    /// Lit cube of edge `side` centered at `center`.
    pub fn cube(center: Vec3, side: f32, color: Color) -> Self {
        let h = side * 0.5;
        let p = |x: f32, y: f32, z: f32| Vertex::new(x * h, y * h, z * h, color);

        // Two counter-clockwise triangles per face, viewed from outside.
        let faces: [[(f32, f32, f32); 4]; 6] = [
            [(-1.0, -1.0, 1.0), (1.0, -1.0, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0)],
            [(1.0, -1.0, -1.0), (-1.0, -1.0, -1.0), (-1.0, 1.0, -1.0), (1.0, 1.0, -1.0)],
            [(-1.0, -1.0, -1.0), (-1.0, -1.0, 1.0), (-1.0, 1.0, 1.0), (-1.0, 1.0, -1.0)],
            [(1.0, -1.0, 1.0), (1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (1.0, 1.0, 1.0)],
            [(-1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, -1.0), (-1.0, 1.0, -1.0)],
            [(-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, -1.0, 1.0), (-1.0, -1.0, 1.0)],
        ];

        let mut vertices = Vec::with_capacity(36);
        for [a, b, c, d] in faces {
            for (x, y, z) in [a, b, c, a, c, d] {
                vertices.push(p(x, y, z));
            }
        }

        let shape = Self::from_vertices("cube", Topology::TriangleList, ShaderKind::Lit, vertices);
        shape.translate(center.x, center.y, center.z);
        shape
    }
}

fn fan(points: &[(f32, f32)], color: Color) -> Vec<Vertex> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };

    rest.windows(2)
        .flat_map(|w| [first, w[0], w[1]])
        .map(|(x, y)| Vertex::new(x, y, 0.0, color))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Topology, ShaderKind, usize)>,
    }

    impl DrawPass for Recorder {
        fn draw(
            &mut self,
            topology: Topology,
            shader: ShaderKind,
            _transform: &DrawTransform,
            vertices: &[Vertex],
        ) -> Result<(), RenderError> {
            self.calls.push((topology, shader, vertices.len()));
            Ok(())
        }
    }

    fn identity() -> DrawTransform {
        DrawTransform::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }

    #[test]
    fn add_vertex_past_capacity_is_rejected() {
        let s = Shape::new("s", Topology::TriangleList, ShaderKind::Flat, 2);
        s.add_vertex(0.0, 0.0, 0.0, Color::RED).unwrap();
        s.add_vertex(1.0, 0.0, 0.0, Color::RED).unwrap();
        assert_eq!(s.add_vertex(2.0, 0.0, 0.0, Color::RED), Err(ShapeError::Full { capacity: 2 }));
        assert_eq!(s.vertex_count(), 2);
    }

    #[test]
    fn vertex_position_out_of_bounds() {
        let s = Shape::triangle((0.0, 0.0), (1.0, 0.0), (0.0, 1.0), Color::RED);
        assert_eq!(s.vertex_position(1).unwrap(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(s.vertex_position(3), Err(ShapeError::OutOfBounds { index: 3, len: 3 }));
    }

    #[test]
    fn partial_triangles_are_not_submitted() {
        let s = Shape::new("s", Topology::TriangleList, ShaderKind::Flat, 6);
        for i in 0..4 {
            s.add_vertex(i as f32, 0.0, 0.0, Color::RED).unwrap();
        }
        let mut rec = Recorder::default();
        s.render(&mut rec, &identity()).unwrap();
        assert_eq!(rec.calls, vec![(Topology::TriangleList, ShaderKind::Flat, 3)]);
    }

    #[test]
    fn empty_shape_renders_nothing() {
        let s = Shape::new("s", Topology::LineList, ShaderKind::Flat, 4);
        let mut rec = Recorder::default();
        s.render(&mut rec, &identity()).unwrap();
        assert!(rec.calls.is_empty());
    }

    #[test]
    fn rectangle_is_positioned_by_translation() {
        let r = Shape::rectangle(200.0, 150.0, 40.0, 20.0, Color::RED);
        assert_eq!(r.vertex_count(), 6);
        assert_eq!(r.translation(), Vec3::new(200.0, 150.0, 0.0));
        let corner = r.model_matrix().transform_point3(r.vertex_position(0).unwrap());
        assert_eq!(corner, Vec3::new(180.0, 140.0, 0.0));
    }

    #[test]
    fn ellipse_is_a_fan_of_its_perimeter() {
        let e = Shape::ellipse(100.0, 80.0, 30.0, 10.0, Color::RED);
        assert_eq!(e.vertex_count(), (ELLIPSE_SEGMENTS - 2) * 3);
        assert_eq!(e.translation(), Vec3::new(100.0, 80.0, 0.0));

        let st = e.state.lock();
        for v in st.vertices.iter() {
            let [x, y, _] = v.position;
            let r = (x / 30.0).powi(2) + (y / 10.0).powi(2);
            assert!((r - 1.0).abs() < 1e-4, "vertex ({x}, {y}) is off the perimeter");
        }
    }

    #[test]
    fn circle_uses_one_radius() {
        let c = Shape::circle(0.0, 0.0, 5.0, Color::BLUE);
        assert_eq!(c.label(), "circle");
        assert_eq!(c.vertex_count(), (ELLIPSE_SEGMENTS - 2) * 3);
        let p = c.vertex_position(0).unwrap();
        assert!((p.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn cube_has_outward_normals() {
        let c = Shape::cube(Vec3::ZERO, 2.0, Color::WHITE);
        assert_eq!(c.vertex_count(), 36);
        assert_eq!(c.shader(), ShaderKind::Lit);

        let st = c.state.lock();
        for v in st.vertices.iter() {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!(p.dot(n) > 0.0, "normal {n:?} points inward at {p:?}");
        }
    }

    #[test]
    fn set_capacity_truncates() {
        let s = Shape::polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], Color::BLUE);
        assert_eq!(s.vertex_count(), 6);
        s.set_capacity(3);
        assert_eq!(s.vertex_count(), 3);
        assert_eq!(s.capacity(), 3);
    }

    #[test]
    fn set_color_recolors_all_vertices() {
        let s = Shape::line((0.0, 0.0), (5.0, 5.0), Color::RED);
        s.set_color(Color::GREEN);
        let st = s.state.lock();
        assert!(st.vertices.iter().all(|v| v.color() == Color::GREEN));
    }
}
