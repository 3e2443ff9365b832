use std::collections::VecDeque;
use std::sync::Arc;

use glam::{Vec3, Vec4};
use parking_lot::Mutex;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform as SkiaTransform};

use crate::input::InputEvent;
use crate::paint::{Color, ColorInt};
use crate::render::{check_vertex_count, lambert, DrawPass, DrawTransform, RenderError, ShaderKind, Topology, Vertex};

use super::{Backend, BackendCaps, BackendError, BackendFactory, EventPump, FrameStart, WindowSpec};

#[derive(Debug, Default)]
struct ProbeState {
    events: VecDeque<InputEvent>,
    diagnostics: Vec<String>,
    failure: Option<BackendError>,
    frames_presented: u64,
    last_draw_count: usize,
    pumps: u64,
}

/// Test-side handle into a headless backend.
///
/// Stands in for the window system: events injected here are delivered by the
/// backend as if a user produced them, and reported diagnostics surface like
/// graphics-API errors.
#[derive(Debug, Clone, Default)]
pub struct HeadlessProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl HeadlessProbe {
    pub fn inject(&self, ev: InputEvent) {
        self.inner.lock().events.push_back(ev);
    }

    /// Queues a non-fatal diagnostic for the next frame.
    pub fn report(&self, msg: impl Into<String>) {
        self.inner.lock().diagnostics.push(msg.into());
    }

    /// Makes the next `create` fail with `err`.
    pub fn fail_with(&self, err: BackendError) {
        self.inner.lock().failure = Some(err);
    }

    pub fn frames_presented(&self) -> u64 {
        self.inner.lock().frames_presented
    }

    /// Draw calls accepted during the last presented frame.
    pub fn last_draw_count(&self) -> usize {
        self.inner.lock().last_draw_count
    }

    /// How many times the caller-thread pump ran.
    pub fn pumps(&self) -> u64 {
        self.inner.lock().pumps
    }

    fn drain_events(&self, out: &mut Vec<InputEvent>) {
        out.extend(self.inner.lock().events.drain(..));
    }
}

/// Builds [`HeadlessBackend`]s.
#[derive(Debug, Clone)]
pub struct HeadlessFactory {
    caps: BackendCaps,
    display: Option<(u32, u32)>,
    probe: HeadlessProbe,
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self {
            caps: BackendCaps::default(),
            display: Some((1920, 1080)),
            probe: HeadlessProbe::default(),
        }
    }
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor size reported to the canvas; `None` emulates a missing monitor query.
    pub fn with_display(mut self, display: Option<(u32, u32)>) -> Self {
        self.display = display;
        self
    }

    /// Delivers injected events through the caller-thread pump instead of `poll_events`.
    pub fn with_caller_pump(mut self, enabled: bool) -> Self {
        self.caps.pump_from_caller = enabled;
        self
    }

    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }
}

struct HeadlessPump {
    probe: HeadlessProbe,
}

impl EventPump for HeadlessPump {
    fn pump(&mut self, out: &mut Vec<InputEvent>) {
        self.probe.inner.lock().pumps += 1;
        self.probe.drain_events(out);
    }
}

impl BackendFactory for HeadlessFactory {
    fn caps(&self) -> BackendCaps {
        self.caps
    }

    fn display_size(&self) -> Option<(u32, u32)> {
        self.display
    }

    fn take_event_pump(&mut self) -> Option<Box<dyn EventPump>> {
        self.caps
            .pump_from_caller
            .then(|| Box::new(HeadlessPump { probe: self.probe.clone() }) as Box<dyn EventPump>)
    }

    fn create(self: Box<Self>, spec: &WindowSpec) -> Result<Box<dyn Backend>, BackendError> {
        let HeadlessFactory { caps, probe, .. } = *self;
        if let Some(err) = probe.inner.lock().failure.take() {
            return Err(err);
        }

        let mut backend = HeadlessBackend::new(spec.width, spec.height)?;
        backend.probe = probe;
        backend.route_events = !caps.pump_from_caller;

        log::debug!("headless: created {}x{} target for {:?}", spec.width, spec.height, spec.title);
        Ok(Box::new(backend))
    }
}

/// Software rasterizer backend built on tiny-skia.
///
/// Geometry goes through the same MVP as on the GPU, then each triangle is
/// filled with the average of its vertex colors. There is no depth buffer;
/// lit triangles facing away from the viewer are culled instead, which is
/// exact for convex solids.
pub struct HeadlessBackend {
    raster: Raster,
    front: Vec<u8>,
    probe: HeadlessProbe,
    route_events: bool,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Result<Self, BackendError> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| BackendError::Surface(format!("invalid target size {width}x{height}")))?;

        Ok(Self {
            raster: Raster { pixmap, draws: 0 },
            front: Vec::new(),
            probe: HeadlessProbe::default(),
            route_events: true,
        })
    }

    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }

    /// Copies the back buffer into the front buffer, bottom row first.
    fn present(&mut self) {
        let w = self.raster.pixmap.width() as usize;
        self.front.clear();
        self.front.reserve(self.raster.pixmap.data().len());

        for row in self.raster.pixmap.pixels().chunks_exact(w).rev() {
            for px in row {
                let c = px.demultiply();
                self.front.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
            }
        }
    }
}

impl Backend for HeadlessBackend {
    fn size(&self) -> (u32, u32) {
        (self.raster.pixmap.width(), self.raster.pixmap.height())
    }

    fn poll_events(&mut self, out: &mut Vec<InputEvent>) {
        if self.route_events {
            self.probe.drain_events(out);
        }
    }

    fn begin_frame(&mut self, clear: Color) -> Result<FrameStart, BackendError> {
        let c = ColorInt::from(clear);
        self.raster.pixmap.fill(tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a));
        self.raster.draws = 0;
        Ok(FrameStart::Ready)
    }

    fn pass(&mut self) -> &mut dyn DrawPass {
        &mut self.raster
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        self.present();

        let mut st = self.probe.inner.lock();
        st.frames_presented += 1;
        st.last_draw_count = self.raster.draws;
        Ok(())
    }

    fn read_pixels(&mut self, out: &mut Vec<u8>) -> bool {
        if self.front.is_empty() {
            return false;
        }
        out.clear();
        out.extend_from_slice(&self.front);
        true
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.probe.inner.lock().diagnostics)
    }
}

struct Raster {
    pixmap: Pixmap,
    draws: usize,
}

impl Raster {
    /// Clip space → pixel coordinates (top-left origin). `None` behind the eye.
    fn project(&self, transform: &DrawTransform, v: &Vertex) -> Option<(f32, f32)> {
        let [x, y, z] = v.position;
        let clip = transform.mvp * Vec4::new(x, y, z, 1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }

        let (w, h) = (self.pixmap.width() as f32, self.pixmap.height() as f32);
        let ndc = clip.truncate() / clip.w;
        Some(((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h))
    }

    fn fill_triangle(&mut self, pts: [(f32, f32); 3], color: Color) {
        let mut pb = PathBuilder::new();
        pb.move_to(pts[0].0, pts[0].1);
        pb.line_to(pts[1].0, pts[1].1);
        pb.line_to(pts[2].0, pts[2].1);
        pb.close();

        // Degenerate triangles produce no path.
        let Some(path) = pb.finish() else { return };
        let paint = solid_paint(color);
        self.pixmap.fill_path(&path, &paint, FillRule::Winding, SkiaTransform::identity(), None);
    }

    fn stroke_line(&mut self, a: (f32, f32), b: (f32, f32), color: Color) {
        let mut pb = PathBuilder::new();
        pb.move_to(a.0, a.1);
        pb.line_to(b.0, b.1);

        let Some(path) = pb.finish() else { return };
        let paint = solid_paint(color);
        let stroke = Stroke { width: 1.0, ..Stroke::default() };
        self.pixmap.stroke_path(&path, &paint, &stroke, SkiaTransform::identity(), None);
    }
}

impl DrawPass for Raster {
    fn draw(
        &mut self,
        topology: Topology,
        shader: ShaderKind,
        transform: &DrawTransform,
        vertices: &[Vertex],
    ) -> Result<(), RenderError> {
        check_vertex_count(topology, vertices.len())?;

        match topology {
            Topology::TriangleList => {
                // A positive determinant means the transform mirrors winding.
                let mirrored = transform.mvp.determinant() > 0.0;

                for tri in vertices.chunks_exact(3) {
                    let (Some(a), Some(b), Some(c)) = (
                        self.project(transform, &tri[0]),
                        self.project(transform, &tri[1]),
                        self.project(transform, &tri[2]),
                    ) else {
                        continue;
                    };

                    let mut color = average_color(tri);

                    if shader == ShaderKind::Lit {
                        // Pixel space has +Y down, so front faces have negative area.
                        let area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
                        if (area < 0.0) == mirrored {
                            continue;
                        }
                        let n = transform.model.transform_vector3(Vec3::from(tri[0].normal));
                        color = color.shaded(lambert(n));
                    }

                    self.fill_triangle([a, b, c], color);
                }
            }

            Topology::LineList => {
                for seg in vertices.chunks_exact(2) {
                    let (Some(a), Some(b)) = (self.project(transform, &seg[0]), self.project(transform, &seg[1])) else {
                        continue;
                    };
                    self.stroke_line(a, b, average_color(seg));
                }
            }
        }

        self.draws += 1;
        Ok(())
    }
}

fn average_color(vertices: &[Vertex]) -> Color {
    let n = vertices.len().max(1) as f32;
    let sum = vertices
        .iter()
        .fold([0.0f32; 4], |acc, v| std::array::from_fn(|i| acc[i] + v.color[i]));
    Color::new(sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n)
}

fn solid_paint(color: Color) -> Paint<'static> {
    let c = ColorInt::from(color);
    let mut paint = Paint::default();
    paint.set_color_rgba8(c.r, c.g, c.b, c.a);
    paint.anti_alias = false;
    paint
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::camera::{Camera, ViewMode};

    fn pixel_at(front: &[u8], width: u32, height: u32, x: u32, y: u32) -> ColorInt {
        // Front buffer is bottom-up.
        let row = (height - 1 - y) as usize;
        let i = (row * width as usize + x as usize) * 4;
        ColorInt::new(front[i], front[i + 1], front[i + 2], front[i + 3])
    }

    fn flat_transform(w: u32, h: u32, model: Mat4) -> DrawTransform {
        let m = Camera::new(ViewMode::Flat2D).matrices(w, h);
        DrawTransform::new(m.camera, m.view, model)
    }

    fn quad(x0: f32, y0: f32, x1: f32, y1: f32, color: Color) -> Vec<Vertex> {
        [(x0, y0), (x1, y0), (x1, y1), (x0, y0), (x1, y1), (x0, y1)]
            .iter()
            .map(|&(x, y)| Vertex::new(x, y, 0.0, color))
            .collect()
    }

    #[test]
    fn clear_then_present_fills_background() {
        let mut b = HeadlessBackend::new(8, 4).unwrap();
        b.begin_frame(Color::BLUE).unwrap();
        b.end_frame().unwrap();

        let mut px = Vec::new();
        assert!(b.read_pixels(&mut px));
        assert_eq!(px.len(), 8 * 4 * 4);
        assert_eq!(pixel_at(&px, 8, 4, 7, 3), ColorInt::new(0, 0, 255, 255));
    }

    #[test]
    fn nothing_to_read_before_first_present() {
        let mut b = HeadlessBackend::new(2, 2).unwrap();
        assert!(!b.read_pixels(&mut Vec::new()));
    }

    #[test]
    fn zero_size_target_is_a_surface_error() {
        assert!(matches!(HeadlessBackend::new(0, 10), Err(BackendError::Surface(_))));
    }

    #[test]
    fn flat_quad_lands_at_pixel_coordinates() {
        let (w, h) = (40, 30);
        let mut b = HeadlessBackend::new(w, h).unwrap();
        b.begin_frame(Color::BLACK).unwrap();

        let xf = flat_transform(w, h, Mat4::IDENTITY);
        b.pass().draw(Topology::TriangleList, ShaderKind::Flat, &xf, &quad(0.0, 0.0, 10.0, 5.0, Color::RED)).unwrap();
        b.end_frame().unwrap();

        let mut px = Vec::new();
        b.read_pixels(&mut px);
        assert_eq!(pixel_at(&px, w, h, 2, 2), ColorInt::new(255, 0, 0, 255));
        assert_eq!(pixel_at(&px, w, h, 20, 20), ColorInt::new(0, 0, 0, 255));
        assert_eq!(b.probe().last_draw_count(), 1);
    }

    #[test]
    fn ragged_vertex_run_is_rejected() {
        let mut b = HeadlessBackend::new(4, 4).unwrap();
        b.begin_frame(Color::BLACK).unwrap();
        let xf = flat_transform(4, 4, Mat4::IDENTITY);
        let err = b.pass().draw(Topology::LineList, ShaderKind::Flat, &xf, &quad(0.0, 0.0, 1.0, 1.0, Color::RED)[..3]);
        assert!(matches!(err, Err(RenderError::InvalidVertexCount { .. })));
    }

    #[test]
    fn probe_routes_events_and_diagnostics() {
        let factory = HeadlessFactory::new();
        let probe = factory.probe();
        let spec = WindowSpec { title: "t".into(), x: 0, y: 0, width: 4, height: 4, readback: true };
        let mut backend = Box::new(factory).create(&spec).unwrap();

        probe.inject(InputEvent::CloseRequested);
        probe.report("GL_INVALID_OPERATION");

        let mut events = Vec::new();
        backend.poll_events(&mut events);
        assert_eq!(events, vec![InputEvent::CloseRequested]);
        assert_eq!(backend.take_diagnostics(), vec!["GL_INVALID_OPERATION".to_string()]);
        assert!(backend.take_diagnostics().is_empty());
    }

    #[test]
    fn caller_pump_takes_over_event_delivery() {
        let mut factory = HeadlessFactory::new().with_caller_pump(true);
        let probe = factory.probe();
        let mut pump = factory.take_event_pump().unwrap();
        let spec = WindowSpec { title: "t".into(), x: 0, y: 0, width: 4, height: 4, readback: true };
        let mut backend = Box::new(factory).create(&spec).unwrap();

        probe.inject(InputEvent::Focused(true));

        let mut polled = Vec::new();
        backend.poll_events(&mut polled);
        assert!(polled.is_empty());

        let mut pumped = Vec::new();
        pump.pump(&mut pumped);
        assert_eq!(pumped, vec![InputEvent::Focused(true)]);
        assert_eq!(probe.pumps(), 1);
    }

    #[test]
    fn injected_failure_aborts_create() {
        let factory = HeadlessFactory::new();
        factory.probe().fail_with(BackendError::WindowCreation("no display".into()));
        let spec = WindowSpec { title: "t".into(), x: 0, y: 0, width: 4, height: 4, readback: true };
        assert_eq!(
            Box::new(factory).create(&spec).err(),
            Some(BackendError::WindowCreation("no display".into()))
        );
    }
}
