//! Retained scene: drawables and the buffer the render loop consumes.
//!
//! Responsibilities:
//! - define the capability contract every drawable honours
//! - keep the shared scene buffer consistent across application threads and the render thread
//! - provide deterministic paint order (layer + insertion order)

mod buffer;
mod drawable;
mod layer;
mod shape;
mod transform;

pub use buffer::{RenderGuard, SceneBuffer, SceneEntry, SceneError};
pub use drawable::{same_drawable, Drawable, DrawableHandle};
pub use layer::{Layer, PaintKey};
pub use shape::{Shape, ShapeError, ELLIPSE_SEGMENTS};
pub use transform::Transform;
