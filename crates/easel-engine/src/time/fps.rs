use std::time::Instant;

/// Number of frames per FPS sampling window.
pub const FPS_WINDOW: u32 = 60;

/// Frame rate averaged over fixed windows of presented frames.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: u32,
    window_start: Instant,
    window_frames: u32,
    fps: f32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::with_window(FPS_WINDOW)
    }

    pub fn with_window(window: u32) -> Self {
        Self {
            window: window.max(1),
            window_start: Instant::now(),
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Last completed sample; 0 until the first window closes.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Counts one frame. Returns the new sample when it completes a window.
    pub fn frame(&mut self) -> Option<f32> {
        self.window_frames += 1;
        if self.window_frames < self.window {
            return None;
        }

        let now = Instant::now();
        let span = now.saturating_duration_since(self.window_start).as_secs_f32();
        if span > 0.0 {
            self.fps = self.window_frames as f32 / span;
        }
        self.window_frames = 0;
        self.window_start = now;
        Some(self.fps)
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn samples_once_per_window() {
        let mut meter = FpsMeter::with_window(4);
        let samples: Vec<_> = (0..8)
            .map(|_| {
                std::thread::sleep(Duration::from_millis(2));
                meter.frame()
            })
            .collect();

        assert!(samples[..3].iter().all(Option::is_none));
        assert!(samples[3].is_some());
        assert!(samples[4..7].iter().all(Option::is_none));
        assert!(samples[7].is_some());
        let fps = meter.fps();
        assert!(fps > 0.0 && fps < 1000.0, "fps {fps}");
    }

    #[test]
    fn zero_window_is_one_frame() {
        let mut meter = FpsMeter::with_window(0);
        std::thread::sleep(Duration::from_millis(1));
        assert!(meter.frame().is_some());
    }
}
