//! Camera state and per-frame matrices.

mod view;

pub use view::{Camera, CameraDrag, CameraMatrices, ViewMode};
