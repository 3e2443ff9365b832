use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::types::{Action, Button, InputEvent};

pub type ButtonCallback = Arc<dyn Fn() + Send + Sync>;
pub type ScrollCallback = Arc<dyn Fn(f32, f32) + Send + Sync>;

/// `(button, action)` → callback table plus one scroll callback.
///
/// Registration may happen from any thread. Dispatch runs on the render
/// thread; callbacks are cloned out of the table before they run, so a
/// callback may itself bind, unbind or touch the scene.
#[derive(Default)]
pub struct Bindings {
    buttons: Mutex<HashMap<(Button, Action), ButtonCallback>>,
    scroll: Mutex<Option<ScrollCallback>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f`; the last registration for a pair wins.
    pub fn bind(&self, button: Button, action: Action, f: ButtonCallback) {
        self.buttons.lock().insert((button, action), f);
    }

    pub fn unbind(&self, button: Button, action: Action) -> bool {
        self.buttons.lock().remove(&(button, action)).is_some()
    }

    pub fn bind_scroll(&self, f: ScrollCallback) {
        *self.scroll.lock() = Some(f);
    }

    pub fn is_bound(&self, button: Button, action: Action) -> bool {
        self.buttons.lock().contains_key(&(button, action))
    }

    /// Invokes the callback bound to `ev`, if any. Returns whether one ran.
    pub fn dispatch(&self, ev: &InputEvent) -> bool {
        match *ev {
            InputEvent::Key { repeat: true, .. } => false,
            InputEvent::Key { key, action, .. } => self.fire(Button::Key(key), action),
            InputEvent::PointerButton { button, action, .. } => self.fire(Button::Mouse(button), action),
            InputEvent::Scroll { dx, dy } => {
                let cb = self.scroll.lock().clone();
                match cb {
                    Some(cb) => {
                        cb(dx, dy);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn fire(&self, button: Button, action: Action) -> bool {
        let cb = self.buttons.lock().get(&(button, action)).cloned();
        match cb {
            Some(cb) => {
                log::trace!("input: dispatch {button} {action:?}");
                cb();
                true
            }
            None => false,
        }
    }

    /// Drops every callback. Breaks reference cycles through captured canvas handles.
    pub fn clear(&self) {
        self.buttons.lock().clear();
        *self.scroll.lock() = None;
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("buttons", &self.buttons.lock().len())
            .field("scroll", &self.scroll.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::input::{Key, MouseButton};

    fn counter() -> (Arc<AtomicUsize>, ButtonCallback) {
        let n = Arc::new(AtomicUsize::new(0));
        let c = n.clone();
        (n, Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn last_registration_wins() {
        let b = Bindings::new();
        let (first, f1) = counter();
        let (second, f2) = counter();
        b.bind(Key::Escape.into(), Action::Press, f1);
        b.bind(Key::Escape.into(), Action::Press, f2);

        assert!(b.dispatch(&InputEvent::key(Key::Escape, Action::Press)));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn action_is_part_of_the_key() {
        let b = Bindings::new();
        let (n, f) = counter();
        b.bind(MouseButton::Left.into(), Action::Release, f);

        assert!(!b.dispatch(&InputEvent::mouse(MouseButton::Left, Action::Press)));
        assert!(b.dispatch(&InputEvent::mouse(MouseButton::Left, Action::Release)));
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeats_are_not_dispatched() {
        let b = Bindings::new();
        let (n, f) = counter();
        b.bind(Key::A.into(), Action::Press, f);

        let ev = InputEvent::Key { key: Key::A, action: Action::Press, modifiers: Default::default(), repeat: true };
        assert!(!b.dispatch(&ev));
        assert_eq!(n.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_may_rebind_during_dispatch() {
        let b = Arc::new(Bindings::new());
        let inner = b.clone();
        b.bind(
            Key::Space.into(),
            Action::Press,
            Arc::new(move || inner.bind(Key::Space.into(), Action::Press, Arc::new(|| {}))),
        );

        assert!(b.dispatch(&InputEvent::key(Key::Space, Action::Press)));
        assert!(b.is_bound(Key::Space.into(), Action::Press));
        b.clear();
    }

    #[test]
    fn scroll_callback_receives_offsets() {
        let b = Bindings::new();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        b.bind_scroll(Arc::new(move |dx, dy| *s.lock() = Some((dx, dy))));

        assert!(b.dispatch(&InputEvent::Scroll { dx: 0.0, dy: -2.0 }));
        assert_eq!(*seen.lock(), Some((0.0, -2.0)));

        b.clear();
        assert!(!b.dispatch(&InputEvent::Scroll { dx: 1.0, dy: 1.0 }));
    }
}
