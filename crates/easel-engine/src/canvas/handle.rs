use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::Duration;

use glam::Vec3;
use parking_lot::Mutex;

use crate::backend::{BackendError, EventPump, WindowSpec};
use crate::camera::{Camera, ViewMode};
use crate::input::{Action, Bindings, Button, InputEvent, Key};
use crate::paint::{Color, ColorInt};
use crate::scene::{DrawableHandle, Layer, SceneBuffer, SceneEntry, SceneError};
use crate::time::Timer;

use super::capture::{frame_path, CaptureRequests};
use super::config::{CanvasConfig, Geometry};
use super::framebuffer::{FrameBuffer, FrameSnapshot};
use super::lifecycle::{CanvasState, Lifecycle};
use super::CanvasError;

/// State shared between the canvas owner, its handles and the render thread.
pub(crate) struct Shared {
    pub config: CanvasConfig,
    pub geometry: Geometry,
    /// Monitor size reported by the backend at construction.
    pub display: Option<(u32, u32)>,

    pub lifecycle: Lifecycle,
    pub scene: SceneBuffer,
    pub framebuffer: FrameBuffer,
    pub bindings: Bindings,
    pub timer: Timer,

    pub camera: Mutex<Camera>,
    pub background: Mutex<Color>,
    pub default_layer: Mutex<Layer>,
    /// Pointer position sampled at the start of the last frame.
    pub mouse: Mutex<(f32, f32)>,
    pub fps: Mutex<f32>,
    pub show_fps: AtomicBool,
    pub capture: Mutex<CaptureRequests>,

    /// Caller-thread pump and the events it produced, drained by the render loop.
    pub pump: Option<Mutex<Box<dyn EventPump>>>,
    pub pumped: Mutex<Vec<InputEvent>>,

    pub render_thread: Mutex<Option<ThreadId>>,
    pub fatal: Mutex<Option<BackendError>>,
    pub panicked: AtomicBool,
}

impl Shared {
    pub fn new(
        config: CanvasConfig,
        geometry: Geometry,
        display: Option<(u32, u32)>,
        pump: Option<Box<dyn EventPump>>,
    ) -> Arc<Self> {
        let shared = Arc::new(Self {
            geometry,
            display,
            lifecycle: Lifecycle::new(),
            scene: SceneBuffer::new(),
            framebuffer: FrameBuffer::new(),
            bindings: Bindings::new(),
            timer: Timer::new(config.period()),
            camera: Mutex::new(Camera::new(config.view_mode)),
            background: Mutex::new(config.background),
            default_layer: Mutex::new(Layer::DEFAULT),
            mouse: Mutex::new((0.0, 0.0)),
            fps: Mutex::new(0.0),
            show_fps: AtomicBool::new(config.show_fps),
            capture: Mutex::new(CaptureRequests::default()),
            pump: pump.map(Mutex::new),
            pumped: Mutex::new(Vec::new()),
            render_thread: Mutex::new(None),
            fatal: Mutex::new(None),
            panicked: AtomicBool::new(false),
            config,
        });

        // Weak so the binding table does not keep the canvas alive.
        let weak: Weak<Shared> = Arc::downgrade(&shared);
        shared.bindings.bind(
            Key::Escape.into(),
            Action::Press,
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.lifecycle.request_close();
                }
            }),
        );

        shared
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec {
            title: self.config.title.clone(),
            x: self.geometry.x,
            y: self.geometry.y,
            width: self.geometry.width,
            height: self.geometry.height,
            readback: self.config.readback,
        }
    }

    pub fn on_render_thread(&self) -> bool {
        *self.render_thread.lock() == Some(std::thread::current().id())
    }

    /// Runs the caller-thread pump, if the backend has one.
    pub fn pump(&self) {
        let Some(pump) = self.pump.as_ref() else { return };
        let mut out = Vec::new();
        pump.lock().pump(&mut out);
        if !out.is_empty() {
            self.pumped.lock().extend(out);
        }
    }

    /// Blocks until the render thread finished and reports how it ended.
    pub fn wait(&self) -> Result<(), CanvasError> {
        if self.lifecycle.state() == CanvasState::Constructed {
            return Err(CanvasError::NotStarted);
        }
        if self.on_render_thread() {
            return Err(CanvasError::WaitOnRenderThread);
        }

        if self.pump.is_some() {
            while !self.lifecycle.wait_finished_for(Duration::from_millis(5)) {
                self.pump();
            }
        } else {
            self.lifecycle.wait_finished();
        }

        if let Some(err) = self.fatal.lock().clone() {
            return Err(CanvasError::Backend(err));
        }
        if self.panicked.load(Ordering::Acquire) {
            return Err(CanvasError::RenderThreadPanicked);
        }
        Ok(())
    }
}

/// Cheap, clonable view of a canvas for callbacks and worker threads.
///
/// Every method is safe to call from any thread, including from binding
/// callbacks running on the render thread (except [`wait`](Self::wait)).
#[derive(Clone)]
pub struct CanvasHandle {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for CanvasHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasHandle")
            .field("title", &self.shared.config.title)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CanvasHandle {
    // ── lifecycle ────────────────────────────────────────────────────────

    pub fn state(&self) -> CanvasState {
        self.shared.lifecycle.state()
    }

    /// True while the render thread is starting or drawing.
    pub fn is_open(&self) -> bool {
        matches!(self.state(), CanvasState::Started | CanvasState::Rendering)
    }

    /// Requests termination. The render thread exits before its next frame.
    pub fn close(&self) {
        if self.shared.lifecycle.request_close() {
            log::debug!("canvas: close requested");
        }
    }

    /// Blocks until the render thread has finished.
    ///
    /// Fails before `start`, from the render thread itself, and after a fatal
    /// backend error (which is returned).
    pub fn wait(&self) -> Result<(), CanvasError> {
        self.shared.wait()
    }

    /// `close` followed by `wait`.
    pub fn stop(&self) -> Result<(), CanvasError> {
        self.close();
        self.shared.wait()
    }

    // ── scene ────────────────────────────────────────────────────────────

    fn layer_for(&self, handle: &DrawableHandle) -> Layer {
        handle.layer().unwrap_or_else(|| *self.shared.default_layer.lock())
    }

    /// Adds a drawable the caller keeps responsibility for. No-op once finished.
    pub fn add(&self, handle: DrawableHandle) -> Result<(), SceneError> {
        if self.state() == CanvasState::Finished {
            return Ok(());
        }
        let layer = self.layer_for(&handle);
        self.shared.scene.add(handle, layer)
    }

    /// Adds a drawable the canvas takes authority over.
    pub fn add_owned(&self, handle: DrawableHandle) -> Result<(), SceneError> {
        if self.state() == CanvasState::Finished {
            return Ok(());
        }
        let layer = self.layer_for(&handle);
        self.shared.scene.add_owned(handle, layer)
    }

    /// Removes every entry for `handle`. Returns how many were removed.
    pub fn remove(&self, handle: &DrawableHandle) -> usize {
        if self.state() == CanvasState::Finished {
            return 0;
        }
        self.shared.scene.remove(handle)
    }

    /// Empties the scene. See [`SceneBuffer::clear`].
    pub fn clear(&self, destroy: bool) -> Vec<DrawableHandle> {
        if self.state() == CanvasState::Finished {
            return Vec::new();
        }
        self.shared.scene.clear(destroy)
    }

    pub fn scene_len(&self) -> usize {
        self.shared.scene.len()
    }

    /// Entries in insertion order, for diagnostics.
    pub fn scene_snapshot(&self) -> Vec<SceneEntry> {
        self.shared.scene.snapshot()
    }

    pub fn default_layer(&self) -> Layer {
        *self.shared.default_layer.lock()
    }

    /// Layer given to drawables added without one of their own.
    pub fn set_default_layer(&self, layer: Layer) {
        *self.shared.default_layer.lock() = layer;
    }

    // ── pixels ───────────────────────────────────────────────────────────

    /// Color at window coordinates, top-left origin.
    pub fn get_point(&self, x: u32, y: u32) -> Option<ColorInt> {
        self.shared.framebuffer.point(x, y)
    }

    /// Color at `(row, col)`. Same as `get_point(col, row)`.
    pub fn get_pixel(&self, row: u32, col: u32) -> Option<ColorInt> {
        self.get_point(col, row)
    }

    /// Copy of the last presented frame.
    pub fn screen_buffer(&self) -> FrameSnapshot {
        self.shared.framebuffer.snapshot()
    }

    /// Writes the last presented frame to `path` as PNG.
    pub fn save_screenshot(&self, path: impl AsRef<Path>) -> Result<(), CanvasError> {
        self.shared
            .framebuffer
            .snapshot()
            .save_png(path.as_ref())
            .map_err(|e| CanvasError::Capture(format!("{e:#}")))
    }

    /// Saves the next presented frame into the capture directory.
    pub fn take_screenshot(&self) {
        self.shared.capture.lock().take_screenshot();
    }

    /// Saves each of the next `frames` presented frames into the capture directory.
    pub fn record_for_frames(&self, frames: u64) {
        self.shared.capture.lock().record_for_frames(frames);
    }

    pub fn stop_recording(&self) {
        self.shared.capture.lock().stop_recording();
    }

    pub fn is_recording(&self) -> bool {
        self.shared.capture.lock().is_recording()
    }

    /// Path a capture of frame `frame` is written to.
    pub fn capture_path(&self, frame: u64) -> std::path::PathBuf {
        frame_path(&self.shared.config.capture_dir, frame)
    }

    // ── input ────────────────────────────────────────────────────────────

    /// Binds `f` to `(button, action)`. The last binding wins.
    ///
    /// Callbacks run on the render thread, outside the scene lock.
    pub fn bind_to_button(&self, button: impl Into<Button>, action: Action, f: impl Fn() + Send + Sync + 'static) {
        self.shared.bindings.bind(button.into(), action, Arc::new(f));
    }

    pub fn unbind(&self, button: impl Into<Button>, action: Action) -> bool {
        self.shared.bindings.unbind(button.into(), action)
    }

    /// Binds the scroll callback, receiving `(dx, dy)` in lines.
    pub fn bind_to_scroll(&self, f: impl Fn(f32, f32) + Send + Sync + 'static) {
        self.shared.bindings.bind_scroll(Arc::new(f));
    }

    /// Pointer x at the start of the last frame.
    pub fn mouse_x(&self) -> f32 {
        self.shared.mouse.lock().0
    }

    pub fn mouse_y(&self) -> f32 {
        self.shared.mouse.lock().1
    }

    // ── timing ───────────────────────────────────────────────────────────

    /// Frame rate averaged over the last sampling window.
    pub fn fps(&self) -> f32 {
        *self.shared.fps.lock()
    }

    pub fn frame_number(&self) -> u64 {
        self.shared.lifecycle.frames()
    }

    /// Blocks until `n` more frames were presented or the canvas finished.
    /// Returns the frame number reached.
    pub fn wait_frames(&self, n: u64) -> u64 {
        let target = self.frame_number() + n;
        if self.state() == CanvasState::Constructed || self.shared.on_render_thread() {
            return self.frame_number();
        }
        if self.shared.pump.is_some() {
            loop {
                self.shared.pump();
                let reached = self.shared.lifecycle.wait_frame(target, Some(Duration::from_millis(5)));
                if reached >= target || self.state() == CanvasState::Finished {
                    return reached;
                }
            }
        }
        self.shared.lifecycle.wait_frame(target, None)
    }

    /// Sleeps until the next draw-timer boundary.
    pub fn sleep(&self) {
        self.shared.pump();
        self.shared.timer.sleep(false);
    }

    pub fn sleep_for(&self, duration: Duration) {
        self.shared.pump();
        Timer::sleep_for(duration);
    }

    pub fn reps(&self) -> u64 {
        self.shared.timer.reps()
    }

    /// Seconds since the draw timer was last reset.
    pub fn time(&self) -> f64 {
        self.shared.timer.time()
    }

    pub fn time_between_sleeps(&self) -> Duration {
        self.shared.timer.time_between_sleeps()
    }

    pub fn reset_timer(&self) {
        self.shared.timer.reset(None);
    }

    pub fn show_fps(&self, show: bool) {
        self.shared.show_fps.store(show, Ordering::Relaxed);
    }

    // ── window ───────────────────────────────────────────────────────────

    pub fn background_color(&self) -> Color {
        *self.shared.background.lock()
    }

    pub fn set_background_color(&self, color: Color) {
        *self.shared.background.lock() = color;
    }

    pub fn window_width(&self) -> u32 {
        self.shared.geometry.width
    }

    pub fn window_height(&self) -> u32 {
        self.shared.geometry.height
    }

    pub fn window_x(&self) -> i32 {
        self.shared.geometry.x
    }

    pub fn window_y(&self) -> i32 {
        self.shared.geometry.y
    }

    /// Size of the monitor the window was placed on, if the backend knows it.
    pub fn display_size(&self) -> Option<(u32, u32)> {
        self.shared.display
    }

    pub fn title(&self) -> &str {
        &self.shared.config.title
    }

    // ── camera ───────────────────────────────────────────────────────────

    pub fn camera(&self) -> Camera {
        self.shared.camera.lock().clone()
    }

    pub fn set_camera_position(&self, eye: Vec3) {
        self.shared.camera.lock().eye = eye;
    }

    pub fn set_camera_focus_point(&self, target: Vec3) {
        self.shared.camera.lock().target = target;
    }

    pub fn set_camera_perspective(&self, fov_deg: f32, near: f32, far: f32) {
        self.shared.camera.lock().set_perspective(fov_deg, near, far);
    }

    /// Enables pointer-driven camera movement (3D only).
    pub fn set_camera_movement_enabled(&self, enabled: bool) {
        self.shared.camera.lock().movement_enabled = enabled;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.shared.camera.lock().mode
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.shared.camera.lock().set_mode(mode);
    }
}
