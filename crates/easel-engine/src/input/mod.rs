//! Input subsystem.
//!
//! Public API is backend-agnostic and does not expose winit types.
//! Backends translate window-system events into [`InputEvent`]s; the render
//! loop folds them into [`InputState`] and dispatches [`Bindings`].

mod bindings;
mod state;
mod types;

pub(crate) mod platform;

pub use bindings::{Bindings, ButtonCallback, ScrollCallback};
pub use state::InputState;
pub use types::{Action, Button, InputEvent, Key, Modifiers, MouseButton};
