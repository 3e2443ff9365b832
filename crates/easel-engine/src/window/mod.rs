//! winit window backend.
//!
//! Windows are owned by a process-wide platform host; each canvas talks to
//! its window through a [`WinitBackend`] living on the render thread.

mod backend;
mod platform;

pub use backend::{WinitBackend, WinitBackendFactory};
