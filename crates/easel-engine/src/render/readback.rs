use anyhow::{anyhow, Context, Result};

/// Copies presented frames back to the CPU.
///
/// The copy is recorded into the frame's encoder before submission; after the
/// submit, [`resolve`](Self::resolve) maps the staging buffer and writes
/// RGBA8 rows bottom to top.
#[derive(Default)]
pub struct Readback {
    staging: Option<wgpu::Buffer>,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    swap_rb: bool,
    pending: bool,
}

impl Readback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a copy of `texture` into the staging buffer.
    pub fn record(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture) {
        let (width, height) = (texture.width(), texture.height());
        let padded = (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        if self.staging.is_none() || self.width != width || self.height != height {
            self.staging = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("easel readback staging"),
                size: padded as u64 * height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            }));
            self.width = width;
            self.height = height;
            self.padded_bytes_per_row = padded;
        }

        let Some(staging) = self.staging.as_ref() else { return };

        self.swap_rb = matches!(
            texture.format(),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );

        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.pending = true;
    }

    /// Waits for the recorded copy and writes it to `out` (bottom-up RGBA8).
    ///
    /// Returns `Ok(false)` when no copy was recorded.
    pub fn resolve(&mut self, device: &wgpu::Device, out: &mut Vec<u8>) -> Result<bool> {
        if !std::mem::take(&mut self.pending) {
            return Ok(false);
        }
        let staging = self.staging.as_ref().context("readback staging buffer missing")?;

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| anyhow!("device poll failed: {e}"))?;
        rx.recv()
            .context("readback map callback dropped")?
            .map_err(|e| anyhow!("failed to map readback buffer: {e}"))?;

        {
            let data = slice.get_mapped_range();
            let row_bytes = (self.width * 4) as usize;
            out.clear();
            out.reserve(row_bytes * self.height as usize);

            // Texture rows are top-down; the frame buffer snapshot is bottom-up.
            for row in data.chunks_exact(self.padded_bytes_per_row as usize).rev() {
                let row = &row[..row_bytes];
                if self.swap_rb {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                    }
                } else {
                    out.extend_from_slice(row);
                }
            }
        }
        staging.unmap();

        Ok(true)
    }
}
