//! Backend contract between the canvas and a window/graphics implementation.
//!
//! The canvas only needs a handful of capabilities: create a window-backed
//! target on the render thread, poll input, clear/draw/present a frame and
//! read the presented pixels back. Everything else stays behind this seam.
//!
//! Shipped implementations:
//! - [`HeadlessBackend`]: software rasterizer, no window (tests, CI, offscreen use)
//! - [`WinitBackend`](crate::window::WinitBackend): winit window + wgpu mesh renderer

mod error;
mod headless;

pub use error::BackendError;
pub use headless::{HeadlessBackend, HeadlessFactory, HeadlessProbe};

use crate::input::InputEvent;
use crate::paint::Color;
use crate::render::DrawPass;

/// Static properties of a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct BackendCaps {
    /// Platform events can only be pumped from the thread that created the
    /// canvas. `Canvas::sleep`/`wait` pump them as a side effect.
    pub pump_from_caller: bool,
}

/// Resolved window parameters handed to [`BackendFactory::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Copy every presented frame back to the CPU.
    pub readback: bool,
}

/// Outcome of [`Backend::begin_frame`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStart {
    Ready,
    /// No target this frame (minimized, surface lost). Nothing is drawn or presented.
    Skipped,
}

/// Caller-thread event pump for platforms that require one.
pub trait EventPump: Send {
    /// Processes pending platform events. Events not routed through the
    /// backend itself are appended to `out`.
    fn pump(&mut self, out: &mut Vec<InputEvent>);
}

/// Creates a [`Backend`] on the render thread.
///
/// The factory is built on the application thread, queried there for
/// capabilities and monitor size, then moved to the render thread.
pub trait BackendFactory: Send + 'static {
    fn caps(&self) -> BackendCaps;

    /// Current monitor size in pixels, if the platform can report one.
    fn display_size(&self) -> Option<(u32, u32)>;

    /// Hands out the caller-thread pump. Only meaningful with `pump_from_caller`.
    fn take_event_pump(&mut self) -> Option<Box<dyn EventPump>> {
        None
    }

    fn create(self: Box<Self>, spec: &WindowSpec) -> Result<Box<dyn Backend>, BackendError>;
}

/// Live window/graphics target, owned by the render thread.
pub trait Backend {
    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);

    /// Appends input received since the last call.
    fn poll_events(&mut self, out: &mut Vec<InputEvent>);

    /// Starts a frame cleared to `clear`.
    fn begin_frame(&mut self, clear: Color) -> Result<FrameStart, BackendError>;

    /// Draw target for the frame in progress.
    fn pass(&mut self) -> &mut dyn DrawPass;

    /// Finishes and presents the frame in progress.
    fn end_frame(&mut self) -> Result<(), BackendError>;

    /// Copies the last presented frame as RGBA8, rows bottom to top.
    ///
    /// Returns `false` when no pixels are available.
    fn read_pixels(&mut self, out: &mut Vec<u8>) -> bool;

    /// Non-fatal diagnostics produced since the last call.
    fn take_diagnostics(&mut self) -> Vec<String>;
}
