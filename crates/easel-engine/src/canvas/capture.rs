use std::path::PathBuf;

/// Pending screenshot and recording requests, consumed by the render loop.
#[derive(Debug, Default)]
pub(crate) struct CaptureRequests {
    screenshot: bool,
    record_remaining: u64,
}

impl CaptureRequests {
    pub fn take_screenshot(&mut self) {
        self.screenshot = true;
    }

    pub fn record_for_frames(&mut self, frames: u64) {
        self.record_remaining = frames;
    }

    pub fn stop_recording(&mut self) {
        self.record_remaining = 0;
    }

    pub fn is_recording(&self) -> bool {
        self.record_remaining > 0
    }

    /// Whether the frame just presented must be written. Consumes one request.
    pub fn next_frame(&mut self) -> bool {
        if std::mem::take(&mut self.screenshot) {
            return true;
        }
        if self.record_remaining > 0 {
            self.record_remaining -= 1;
            return true;
        }
        false
    }
}

/// File name of a captured frame.
pub(crate) fn frame_path(dir: &std::path::Path, frame: u64) -> PathBuf {
    dir.join(format!("Image{frame:06}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_is_one_shot() {
        let mut c = CaptureRequests::default();
        c.take_screenshot();
        assert!(c.next_frame());
        assert!(!c.next_frame());
    }

    #[test]
    fn recording_counts_down() {
        let mut c = CaptureRequests::default();
        c.record_for_frames(2);
        assert!(c.next_frame());
        assert!(c.is_recording());
        assert!(c.next_frame());
        assert!(!c.next_frame());

        c.record_for_frames(5);
        c.stop_recording();
        assert!(!c.next_frame());
    }

    #[test]
    fn frame_names_are_zero_padded() {
        let p = frame_path(std::path::Path::new("out"), 42);
        assert_eq!(p, PathBuf::from("out").join("Image000042.png"));
    }
}
