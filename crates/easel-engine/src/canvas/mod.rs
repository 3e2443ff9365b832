//! Canvas: lifecycle, shared state and the background render loop.
//!
//! [`Canvas`] owns the render thread; [`CanvasHandle`] is the thread-safe view
//! used from callbacks and worker threads.

mod app;
mod capture;
mod config;
mod error;
mod framebuffer;
mod handle;
mod lifecycle;
mod render_loop;

pub use app::Canvas;
pub use config::CanvasConfig;
pub use error::CanvasError;
pub use framebuffer::FrameSnapshot;
pub use handle::CanvasHandle;
pub use lifecycle::CanvasState;
