//! Color types shared by drawables, backends and frame-buffer readback.

pub mod color;

pub use color::{Color, ColorInt};
