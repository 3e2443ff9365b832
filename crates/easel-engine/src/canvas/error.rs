use crate::backend::BackendError;

/// Misuse of the canvas lifecycle, or a failure reported by its render thread.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas already started")]
    AlreadyStarted,

    #[error("canvas has not been started")]
    NotStarted,

    #[error("wait() called from the canvas render thread")]
    WaitOnRenderThread,

    #[error("render thread panicked")]
    RenderThreadPanicked,

    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("capture failed: {0}")]
    Capture(String),
}
