use std::ops::Deref;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::backend::BackendFactory;
use crate::window::WinitBackendFactory;

use super::config::CanvasConfig;
use super::handle::{CanvasHandle, Shared};
use super::lifecycle::CanvasState;
use super::{render_loop, CanvasError};

/// A window with a background render thread drawing a shared scene.
///
/// `Canvas` owns the render thread; use [`handle`](Self::handle) for a
/// clonable view to pass to callbacks and worker threads. Every
/// [`CanvasHandle`] method is available directly through `Deref`.
///
/// Dropping a canvas that is still rendering closes it and joins the thread.
/// When the drop happens on the render thread itself, the thread is detached
/// and finishes after the current frame.
pub struct Canvas {
    handle: CanvasHandle,
    factory: Mutex<Option<Box<dyn BackendFactory>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Canvas {
    /// Creates a canvas backed by a winit window and wgpu.
    pub fn new(config: CanvasConfig) -> Result<Self, CanvasError> {
        Self::with_backend(config, WinitBackendFactory::new())
    }

    /// Creates a canvas on a custom backend.
    ///
    /// Auto size and position are resolved here through the backend's monitor
    /// query. The backend itself is created later on the render thread.
    pub fn with_backend(config: CanvasConfig, factory: impl BackendFactory) -> Result<Self, CanvasError> {
        let mut factory: Box<dyn BackendFactory> = Box::new(factory);

        let display = factory.display_size();
        let geometry = config.resolve(display)?;

        let pump = if factory.caps().pump_from_caller {
            factory.take_event_pump()
        } else {
            None
        };

        log::debug!(
            "canvas: \"{}\" {}x{} at ({}, {})",
            config.title,
            geometry.width,
            geometry.height,
            geometry.x,
            geometry.y
        );

        Ok(Self {
            handle: CanvasHandle {
                shared: Shared::new(config, geometry, display, pump),
            },
            factory: Mutex::new(Some(factory)),
            thread: Mutex::new(None),
        })
    }

    pub fn handle(&self) -> CanvasHandle {
        self.handle.clone()
    }

    /// Spawns the render thread. Does not block.
    pub fn start(&self) -> Result<(), CanvasError> {
        let shared = &self.handle.shared;
        if !shared.lifecycle.advance(CanvasState::Constructed, CanvasState::Started) {
            return Err(CanvasError::AlreadyStarted);
        }

        let Some(factory) = self.factory.lock().take() else {
            return Err(CanvasError::AlreadyStarted);
        };

        let thread_shared = shared.clone();
        let spawned = std::thread::Builder::new()
            .name("easel-render".into())
            .spawn(move || render_loop::run(thread_shared, factory));

        match spawned {
            Ok(join) => {
                *self.thread.lock() = Some(join);
                Ok(())
            }
            Err(e) => {
                shared.lifecycle.finish();
                Err(CanvasError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Blocks until the render thread has finished, then joins it.
    pub fn wait(&self) -> Result<(), CanvasError> {
        let result = self.handle.wait();
        if !matches!(result, Err(CanvasError::NotStarted | CanvasError::WaitOnRenderThread)) {
            self.join();
        }
        result
    }

    /// `close` followed by `wait`.
    pub fn stop(&self) -> Result<(), CanvasError> {
        self.handle.close();
        self.wait()
    }

    /// Starts the canvas, runs `f` on the calling thread, then waits for the
    /// window to close.
    pub fn run(&self, f: impl FnOnce(&Canvas)) -> Result<(), CanvasError> {
        self.start()?;
        f(self);
        self.wait()
    }

    fn join(&self) {
        if let Some(join) = self.thread.lock().take() {
            if join.join().is_err() {
                log::error!("canvas: render thread could not be joined");
            }
        }
    }
}

impl Deref for Canvas {
    type Target = CanvasHandle;

    fn deref(&self) -> &CanvasHandle {
        &self.handle
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.handle.fmt(f)
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        if self.handle.state() == CanvasState::Constructed {
            return;
        }
        self.handle.close();
        if self.handle.shared.on_render_thread() {
            // Dropped from a binding; a thread cannot join itself.
            self.thread.lock().take();
            return;
        }
        let _ = self.handle.wait();
        self.join();
    }
}
