use std::path::PathBuf;
use std::time::Duration;

use crate::backend::BackendError;
use crate::camera::ViewMode;
use crate::paint::Color;
use crate::time::DEFAULT_PERIOD;

/// Canvas construction parameters.
///
/// `None` position or size are resolved against the backend's monitor when
/// the canvas is created.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub position: Option<(i32, i32)>,
    pub size: Option<(u32, u32)>,
    pub title: String,
    /// Target frame period. `None` or zero means 60 Hz.
    pub frame_period: Option<Duration>,
    pub background: Color,
    pub view_mode: ViewMode,
    /// Exit the process with the error's exit code when the backend fails.
    pub exit_on_fatal: bool,
    /// Log the measured frame rate once per sampling window.
    pub show_fps: bool,
    /// Directory for screenshots and recorded frames.
    pub capture_dir: PathBuf,
    /// Copy presented frames back into the canvas frame buffer.
    pub readback: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            position: None,
            size: None,
            title: "easel".to_string(),
            frame_period: None,
            background: Color::GRAY,
            view_mode: ViewMode::Flat2D,
            exit_on_fatal: true,
            show_fps: false,
            capture_dir: PathBuf::from("."),
            readback: true,
        }
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn with_frame_period(mut self, period: Duration) -> Self {
        self.frame_period = Some(period);
        self
    }

    /// Sets the frame period from a rate. Rates that are not positive, or whose
    /// period does not fit a `Duration`, keep the default.
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_period = (fps > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / fps).ok())
            .flatten();
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_view_mode(mut self, mode: ViewMode) -> Self {
        self.view_mode = mode;
        self
    }

    pub fn with_exit_on_fatal(mut self, exit: bool) -> Self {
        self.exit_on_fatal = exit;
        self
    }

    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    pub fn with_readback(mut self, readback: bool) -> Self {
        self.readback = readback;
        self
    }

    pub(crate) fn period(&self) -> Duration {
        self.frame_period
            .filter(|p| !p.is_zero())
            .unwrap_or(DEFAULT_PERIOD)
    }

    /// Resolves auto size and position against the monitor size.
    ///
    /// Auto size is `w = 1.2 × display height`, `h = 0.75 × w`. Auto position
    /// centers the window, or falls back to the origin without a monitor.
    pub(crate) fn resolve(&self, display: Option<(u32, u32)>) -> Result<Geometry, BackendError> {
        let (width, height) = match self.size {
            Some((w, h)) => (w, h),
            None => {
                let (_, dh) = display.ok_or_else(|| {
                    BackendError::MonitorInfo("auto-sized canvas needs the monitor size".into())
                })?;
                let w = (1.2 * dh as f64) as u32;
                (w, (0.75 * w as f64) as u32)
            }
        };

        let (x, y) = match (self.position, display) {
            (Some(p), _) => p,
            (None, Some((dw, dh))) => (
                (dw as i32 - width as i32) / 2,
                (dh as i32 - height as i32) / 2,
            ),
            (None, None) => (0, 0),
        };

        Ok(Geometry { x, y, width, height })
    }
}

/// Resolved window placement in pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_size_follows_display_height() {
        let g = CanvasConfig::new().resolve(Some((1920, 1080))).unwrap();
        assert_eq!((g.width, g.height), (1296, 972));
        assert_eq!((g.x, g.y), (312, 54));
    }

    #[test]
    fn explicit_geometry_needs_no_monitor() {
        let g = CanvasConfig::new()
            .with_size(400, 300)
            .with_position(10, 20)
            .resolve(None)
            .unwrap();
        assert_eq!(g, Geometry { x: 10, y: 20, width: 400, height: 300 });
    }

    #[test]
    fn auto_size_without_monitor_fails() {
        let err = CanvasConfig::new().resolve(None).unwrap_err();
        assert_eq!(err.exit_code(), 101);
    }

    #[test]
    fn unrepresentable_frame_rate_keeps_the_default() {
        assert_eq!(CanvasConfig::new().with_frame_rate(1e-20).period(), DEFAULT_PERIOD);
        assert_eq!(CanvasConfig::new().with_frame_rate(f64::NAN).period(), DEFAULT_PERIOD);
        assert_eq!(CanvasConfig::new().with_frame_rate(f64::INFINITY).period(), DEFAULT_PERIOD);
    }

    #[test]
    fn non_positive_period_means_sixty_hertz() {
        assert_eq!(CanvasConfig::new().period(), DEFAULT_PERIOD);
        assert_eq!(CanvasConfig::new().with_frame_rate(-1.0).period(), DEFAULT_PERIOD);
        assert_eq!(
            CanvasConfig::new().with_frame_period(Duration::ZERO).period(),
            DEFAULT_PERIOD
        );
        assert_eq!(
            CanvasConfig::new().with_frame_rate(50.0).period(),
            Duration::from_millis(20)
        );
    }
}
