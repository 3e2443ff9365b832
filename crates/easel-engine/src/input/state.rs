use std::collections::HashSet;

use crate::camera::CameraDrag;

use super::types::{Action, InputEvent, Key, Modifiers, MouseButton};

/// Held keys/buttons and pointer position, owned by the render thread.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,

    /// Last known pointer position in window pixels.
    pub pointer: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply_event(&mut self, ev: &InputEvent) {
        match *ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = m,

            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // A release may never arrive once focus is gone.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => self.pointer = Some((x, y)),
            InputEvent::PointerLeft => self.pointer = None,

            InputEvent::Key { key, action, modifiers, .. } => {
                self.modifiers = modifiers;
                match action {
                    Action::Press => {
                        self.keys_down.insert(key);
                    }
                    Action::Release => {
                        self.keys_down.remove(&key);
                    }
                }
            }

            InputEvent::PointerButton { button, action, modifiers } => {
                self.modifiers = modifiers;
                match action {
                    Action::Press => {
                        self.buttons_down.insert(button);
                    }
                    Action::Release => {
                        self.buttons_down.remove(&button);
                    }
                }
            }

            InputEvent::Scroll { .. } | InputEvent::CloseRequested => {}
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Drag flags consumed by the camera step of the next frame.
    pub fn camera_drag(&self) -> CameraDrag {
        CameraDrag {
            mouse_down: self.button_down(MouseButton::Left),
            shift_down: self.modifiers.shift || self.key_down(Key::Shift),
            ctrl_down: self.modifiers.ctrl || self.key_down(Key::Control),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_flags_follow_button_and_modifier_keys() {
        let mut st = InputState::default();
        st.apply_event(&InputEvent::mouse(MouseButton::Left, Action::Press));
        st.apply_event(&InputEvent::key(Key::Shift, Action::Press));

        let drag = st.camera_drag();
        assert!(drag.mouse_down && drag.shift_down && !drag.ctrl_down);

        st.apply_event(&InputEvent::mouse(MouseButton::Left, Action::Release));
        assert!(!st.camera_drag().mouse_down);
    }

    #[test]
    fn focus_loss_clears_held_state() {
        let mut st = InputState::default();
        st.apply_event(&InputEvent::key(Key::A, Action::Press));
        st.apply_event(&InputEvent::mouse(MouseButton::Right, Action::Press));
        st.apply_event(&InputEvent::Focused(false));

        assert!(!st.key_down(Key::A));
        assert!(!st.button_down(MouseButton::Right));
    }

    #[test]
    fn pointer_tracks_moves_and_leave() {
        let mut st = InputState::default();
        st.apply_event(&InputEvent::PointerMoved { x: 12.0, y: 7.5 });
        assert_eq!(st.pointer, Some((12.0, 7.5)));
        st.apply_event(&InputEvent::PointerLeft);
        assert_eq!(st.pointer, None);
    }
}
