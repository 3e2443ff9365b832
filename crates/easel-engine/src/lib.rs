//! easel engine crate.
//!
//! A thread-safe 2D/3D canvas: a background render thread draws a shared
//! scene buffer that any number of application threads mutate concurrently.
//!
//! ```no_run
//! use std::sync::Arc;
//! use easel_engine::{Canvas, CanvasConfig, Color, Shape};
//!
//! let canvas = Canvas::new(CanvasConfig::new().with_size(640, 480)).unwrap();
//! canvas
//!     .run(|c| {
//!         c.add(Arc::new(Shape::rectangle(320.0, 240.0, 100.0, 50.0, Color::RED))).unwrap();
//!     })
//!     .unwrap();
//! ```

pub mod backend;
pub mod camera;
pub mod canvas;
pub mod device;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;

pub use backend::{BackendError, HeadlessFactory};
pub use camera::ViewMode;
pub use canvas::{Canvas, CanvasConfig, CanvasError, CanvasHandle, CanvasState};
pub use input::{Action, Key, MouseButton};
pub use paint::{Color, ColorInt};
pub use scene::{Drawable, DrawableHandle, Layer, Shape};
pub use time::Timer;
