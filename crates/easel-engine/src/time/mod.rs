//! Time subsystem.
//!
//! - [`Timer`]: period-based pacing shared by the render loop and callers of
//!   `Canvas::sleep`
//! - [`FpsMeter`]: windowed frame-rate sampling for the render loop

mod fps;
mod timer;

pub use fps::{FpsMeter, FPS_WINDOW};
pub use timer::{Timer, DEFAULT_PERIOD};
