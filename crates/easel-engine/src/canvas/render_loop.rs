//! Body of the canvas render thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::backend::{Backend, BackendError, BackendFactory, FrameStart};
use crate::input::{InputEvent, InputState};
use crate::render::DrawTransform;
use crate::time::FpsMeter;

use super::capture::frame_path;
use super::handle::Shared;
use super::lifecycle::CanvasState;

/// Entry point of the render thread. Always leaves the canvas `Finished`.
pub(crate) fn run(shared: Arc<Shared>, factory: Box<dyn BackendFactory>) {
    *shared.render_thread.lock() = Some(std::thread::current().id());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| render_thread(&shared, factory)));
    if outcome.is_err() {
        log::error!("canvas: render thread panicked");
        shared.panicked.store(true, Ordering::Release);
    }

    // Callbacks may hold canvas handles; dropping them breaks the cycle.
    shared.bindings.clear();
    shared.lifecycle.finish();
    log::debug!("canvas: render thread finished");
}

fn render_thread(shared: &Shared, factory: Box<dyn BackendFactory>) {
    let spec = shared.window_spec();
    let mut backend = match factory.create(&spec) {
        Ok(backend) => backend,
        Err(err) => return fail(shared, err),
    };

    let (w, h) = backend.size();
    log::info!("canvas: \"{}\" rendering at {w}x{h}", spec.title);

    if !shared.lifecycle.advance(CanvasState::Started, CanvasState::Rendering) {
        log::debug!("canvas: closed before the first frame");
    }

    // Pace from the first frame, not from construction.
    shared.timer.reset(None);

    let mut frames = RenderLoop::new(shared);
    while !shared.lifecycle.close_requested() {
        if let Err(err) = frames.frame(backend.as_mut()) {
            drop(backend);
            return fail(shared, err);
        }
    }

    drop(backend);
}

/// Handles a fatal backend failure according to `exit_on_fatal`.
fn fail(shared: &Shared, err: BackendError) {
    log::error!("canvas: {err}");
    if shared.config.exit_on_fatal {
        std::process::exit(err.exit_code());
    }
    *shared.fatal.lock() = Some(err);
}

struct RenderLoop<'a> {
    shared: &'a Shared,
    input: InputState,
    events: Vec<InputEvent>,
    /// Pointer position the previous camera step saw.
    last_pointer: Option<(f32, f32)>,
    fps: FpsMeter,
    pixels: Vec<u8>,
}

impl<'a> RenderLoop<'a> {
    fn new(shared: &'a Shared) -> Self {
        Self {
            shared,
            input: InputState::default(),
            events: Vec::new(),
            last_pointer: None,
            fps: FpsMeter::new(),
            pixels: Vec::new(),
        }
    }

    fn frame(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        let shared = self.shared;

        self.process_input(backend);
        if shared.lifecycle.close_requested() {
            return Ok(());
        }

        let (width, height) = backend.size();
        let matrices = {
            let mut camera = shared.camera.lock();
            // Drag flags were set by last frame's input; pointer delta spans one frame.
            let (dx, dy) = match (self.input.pointer, self.last_pointer) {
                (Some((x, y)), Some((px, py))) => (x - px, y - py),
                _ => (0.0, 0.0),
            };
            camera.apply_drag(dx, dy, self.input.camera_drag());
            camera.matrices(width, height)
        };
        self.last_pointer = self.input.pointer;

        let background = *shared.background.lock();
        if backend.begin_frame(background)? == FrameStart::Skipped {
            self.report(backend);
            shared.timer.sleep(true);
            return Ok(());
        }

        {
            let mut scene = shared.scene.lock_for_render();
            if let Some(p) = self.input.pointer {
                *shared.mouse.lock() = p;
            }

            for entry in scene.iter_in_paint_order() {
                let drawable = &entry.handle;
                let pass = backend.pass();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let xf = DrawTransform::new(matrices.camera, matrices.view, drawable.model_matrix());
                    drawable.render(pass, &xf)
                }));
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => log::warn!("canvas: {} failed to render: {err}", drawable.label()),
                    Err(_) => log::error!("canvas: {} panicked while rendering", drawable.label()),
                }
            }
        }

        backend.end_frame()?;

        if shared.config.readback && backend.read_pixels(&mut self.pixels) {
            shared.framebuffer.store(width, height, &mut self.pixels);
        }

        let frame = shared.lifecycle.frame_presented();
        self.capture(frame);

        if let Some(fps) = self.fps.frame() {
            *shared.fps.lock() = fps;
            if shared.show_fps.load(Ordering::Relaxed) {
                log::info!("{}: {fps:.1} FPS", shared.config.title);
            }
        }

        self.report(backend);
        shared.timer.sleep(true);
        Ok(())
    }

    /// Polls the backend and the caller pump, then updates input state and
    /// runs bound callbacks.
    fn process_input(&mut self, backend: &mut dyn Backend) {
        let shared = self.shared;

        self.events.clear();
        backend.poll_events(&mut self.events);
        self.events.append(&mut shared.pumped.lock());

        for ev in &self.events {
            self.input.apply_event(ev);
            if let InputEvent::CloseRequested = ev {
                shared.lifecycle.request_close();
                continue;
            }
            shared.bindings.dispatch(ev);
        }
    }

    /// Writes the frame just presented if a capture asked for it.
    fn capture(&mut self, frame: u64) {
        let shared = self.shared;
        if !shared.capture.lock().next_frame() {
            return;
        }

        let path = frame_path(&shared.config.capture_dir, frame);
        match shared.framebuffer.snapshot().save_png(&path) {
            Ok(()) => log::debug!("canvas: saved {}", path.display()),
            Err(e) => log::warn!("canvas: capture failed: {e:#}"),
        }
    }

    fn report(&self, backend: &mut dyn Backend) {
        for msg in backend.take_diagnostics() {
            log::warn!("canvas: backend: {msg}");
        }
    }
}
