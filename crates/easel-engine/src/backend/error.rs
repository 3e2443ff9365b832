/// Fatal failure while bringing up a backend.
///
/// Each variant maps to a distinct process exit code, used when the canvas is
/// configured to exit on fatal errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("window creation failed: {0}")]
    WindowCreation(String),

    #[error("monitor information unavailable: {0}")]
    MonitorInfo(String),

    #[error("graphics context creation failed: {0}")]
    GraphicsContext(String),

    #[error("surface failure: {0}")]
    Surface(String),
}

impl BackendError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            BackendError::WindowCreation(_) => 100,
            BackendError::MonitorInfo(_) => 101,
            BackendError::GraphicsContext(_) => 102,
            BackendError::Surface(_) => 103,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            BackendError::WindowCreation(String::new()).exit_code(),
            BackendError::MonitorInfo(String::new()).exit_code(),
            BackendError::GraphicsContext(String::new()).exit_code(),
            BackendError::Surface(String::new()).exit_code(),
        ];
        assert_eq!(codes, [100, 101, 102, 103]);
    }
}
