//! Rendering seam between drawables and backends.
//!
//! Drawables submit vertex runs through [`DrawPass`]; each backend provides
//! its own implementation. The GPU path batches a frame's draws and records
//! them into a single render pass.
//!
//! Convention:
//! - geometry is in object space; the per-draw MVP maps it to clip space
//! - colors are straight (non-premultiplied) RGBA

mod mesh;
mod pass;
mod readback;

pub use mesh::MeshRenderer;
pub use pass::{
    check_vertex_count, lambert, DrawPass, DrawTransform, RenderError, ShaderKind, Topology, Vertex, AMBIENT,
    LIGHT_DIR,
};
pub use readback::Readback;
