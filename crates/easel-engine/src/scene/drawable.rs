use std::sync::Arc;

use glam::Mat4;

use crate::render::{DrawPass, DrawTransform, RenderError, ShaderKind};

use super::Layer;

/// Capability contract for anything the render loop can draw.
///
/// Implementations guard their own attributes; the render loop calls
/// [`model_matrix`](Self::model_matrix) and [`render`](Self::render) from the
/// render thread while application threads may be mutating those attributes.
pub trait Drawable: Send + Sync {
    /// Object transform (translate × rotate × scale).
    fn model_matrix(&self) -> Mat4;

    /// Submits geometry for this frame.
    ///
    /// Errors are reported by the render loop and do not abort the frame.
    fn render(&self, pass: &mut dyn DrawPass, transform: &DrawTransform) -> Result<(), RenderError>;

    fn shader(&self) -> ShaderKind {
        ShaderKind::Flat
    }

    /// Explicit layer; `None` takes the canvas default when added.
    fn layer(&self) -> Option<Layer> {
        None
    }

    /// Name used in diagnostics.
    fn label(&self) -> &str {
        "drawable"
    }
}

/// Shared handle to a drawable.
pub type DrawableHandle = Arc<dyn Drawable>;

/// Identity comparison on the shared allocation, ignoring vtable pointers.
#[inline]
pub fn same_drawable(a: &DrawableHandle, b: &DrawableHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
