use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use parking_lot::Mutex;

use crate::paint::ColorInt;

/// Copy of a presented frame.
///
/// `pixels` is RGBA8 with rows stored bottom to top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl FrameSnapshot {
    /// Pixel at window coordinates (top-left origin).
    pub fn point(&self, x: u32, y: u32) -> Option<ColorInt> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = (self.height - 1 - y) as usize;
        let i = (row * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some(ColorInt::new(px[0], px[1], px[2], px[3]))
    }

    /// Top-down image of the frame.
    pub fn to_image(&self) -> Option<RgbaImage> {
        let stride = self.width as usize * 4;
        if stride == 0 || self.pixels.len() != stride * self.height as usize {
            return None;
        }
        let flipped: Vec<u8> = self.pixels.chunks_exact(stride).rev().flatten().copied().collect();
        RgbaImage::from_raw(self.width, self.height, flipped)
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let img = self.to_image().context("no frame has been presented")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Last presented frame, behind a lock independent of the scene buffer.
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    frame: Mutex<FrameSnapshot>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps `pixels` into the buffer. `pixels` receives the previous storage
    /// for reuse.
    pub fn store(&self, width: u32, height: u32, pixels: &mut Vec<u8>) {
        if pixels.len() != width as usize * height as usize * 4 {
            log::warn!(
                "framebuffer: dropped readback of {} bytes for {width}x{height}",
                pixels.len()
            );
            return;
        }
        let mut f = self.frame.lock();
        f.width = width;
        f.height = height;
        std::mem::swap(&mut f.pixels, pixels);
    }

    pub fn point(&self, x: u32, y: u32) -> Option<ColorInt> {
        self.frame.lock().point(x, y)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.frame.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 frame, bottom row first: bottom-left red, top-right blue.
    fn sample() -> FrameBuffer {
        let fb = FrameBuffer::new();
        let mut px = vec![
            255, 0, 0, 255, 0, 0, 0, 255, // bottom row
            0, 0, 0, 255, 0, 0, 255, 255, // top row
        ];
        fb.store(2, 2, &mut px);
        fb
    }

    #[test]
    fn point_uses_top_left_origin() {
        let fb = sample();
        assert_eq!(fb.point(0, 1), Some(ColorInt::new(255, 0, 0, 255)));
        assert_eq!(fb.point(1, 0), Some(ColorInt::new(0, 0, 255, 255)));
    }

    #[test]
    fn out_of_bounds_is_none() {
        let fb = sample();
        assert_eq!(fb.point(2, 0), None);
        assert_eq!(fb.point(0, 2), None);
        assert_eq!(FrameBuffer::new().point(0, 0), None);
    }

    #[test]
    fn mismatched_readback_is_ignored() {
        let fb = sample();
        let mut short = vec![0; 4];
        fb.store(2, 2, &mut short);
        assert_eq!(fb.point(0, 1), Some(ColorInt::new(255, 0, 0, 255)));
    }

    #[test]
    fn saving_an_empty_frame_fails() {
        let err = FrameBuffer::new()
            .snapshot()
            .save_png(&std::env::temp_dir().join("easel-empty.png"))
            .unwrap_err();
        assert_eq!(err.to_string(), "no frame has been presented");
    }

    #[test]
    fn save_error_names_the_path() {
        let path = std::env::temp_dir().join("easel-missing-dir").join("nested").join("x.png");
        let err = sample().snapshot().save_png(&path).unwrap_err();
        assert!(format!("{err:#}").contains("x.png"), "{err:#}");
    }

    #[test]
    fn image_is_top_down() {
        let img = sample().snapshot().to_image().unwrap();
        assert_eq!(img.get_pixel(0, 1).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }
}
