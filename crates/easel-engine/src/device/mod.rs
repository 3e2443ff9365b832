//! GPU device + surface management for the winit backend.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the window surface and its depth attachment
//! - acquiring and presenting frames

mod error;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use gpu::{Gpu, GpuFrame};
pub use init::GpuInit;

pub(crate) use surface::DEPTH_FORMAT;
