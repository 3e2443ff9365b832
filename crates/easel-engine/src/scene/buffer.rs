use parking_lot::{Mutex, MutexGuard};

use super::{same_drawable, DrawableHandle, Layer, PaintKey};

/// Rejected scene mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("drawable is already in the scene")]
    AlreadyPresent,
}

/// One slot of the scene buffer.
#[derive(Clone)]
pub struct SceneEntry {
    pub handle: DrawableHandle,
    pub key: PaintKey,
    /// The buffer holds the authoritative reference and releases it on a destroying clear.
    pub owned: bool,
}

impl std::fmt::Debug for SceneEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEntry")
            .field("label", &self.handle.label())
            .field("key", &self.key)
            .field("owned", &self.owned)
            .finish()
    }
}

#[derive(Debug, Default)]
struct SceneList {
    entries: Vec<SceneEntry>,
    next_seq: u64,

    sorted_indices: Vec<usize>,
    sorted_dirty: bool,
}

impl SceneList {
    fn position(&self, handle: &DrawableHandle) -> Option<usize> {
        self.entries.iter().position(|e| same_drawable(&e.handle, handle))
    }

    fn push(&mut self, handle: DrawableHandle, layer: Layer, owned: bool) -> Result<(), SceneError> {
        if self.position(&handle).is_some() {
            return Err(SceneError::AlreadyPresent);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.push(SceneEntry { handle, key: PaintKey::new(layer, seq), owned });
        self.sorted_dirty = true;
        Ok(())
    }

    fn rebuild_sorted_indices(&mut self) {
        self.sorted_indices.clear();
        self.sorted_indices.extend(0..self.entries.len());

        let entries = &self.entries;
        // Keys are unique (seq never repeats), so an unstable sort is deterministic.
        self.sorted_indices.sort_unstable_by_key(|&i| entries[i].key);

        self.sorted_dirty = false;
    }
}

/// Ordered collection of drawables shared between application threads and
/// the render thread.
///
/// One exclusive lock covers every structural mutation and the whole
/// render pass, so a frame always sees a consistent snapshot and no entry is
/// released while it is being drawn.
///
/// Performance characteristics:
/// - `add()` is O(n) for the duplicate check, with an amortized O(1) append
/// - paint-order iteration reuses an internal index buffer and only re-sorts after mutation
#[derive(Debug, Default)]
pub struct SceneBuffer {
    list: Mutex<SceneList>,
}

impl SceneBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a non-owning entry. The caller keeps responsibility for the drawable.
    pub fn add(&self, handle: DrawableHandle, layer: Layer) -> Result<(), SceneError> {
        self.list.lock().push(handle, layer, false)
    }

    /// Appends an entry whose lifetime the buffer controls.
    pub fn add_owned(&self, handle: DrawableHandle, layer: Layer) -> Result<(), SceneError> {
        self.list.lock().push(handle, layer, true)
    }

    /// Removes every entry referring to `handle`. Returns how many were removed.
    pub fn remove(&self, handle: &DrawableHandle) -> usize {
        let released = {
            let mut list = self.list.lock();
            let before = list.entries.len();

            let mut released = Vec::new();
            list.entries.retain(|e| {
                let hit = same_drawable(&e.handle, handle);
                if hit {
                    released.push(e.handle.clone());
                }
                !hit
            });

            if list.entries.len() != before {
                list.sorted_dirty = true;
            }
            released
        };

        // Drop outside the lock: a drawable's destructor may touch other shared state.
        released.len()
    }

    /// Empties the buffer.
    ///
    /// With `destroy`, owned entries are released here. Without it, owned
    /// handles are handed back to the caller. Non-owned entries are forgotten
    /// either way.
    pub fn clear(&self, destroy: bool) -> Vec<DrawableHandle> {
        let entries = {
            let mut list = self.list.lock();
            list.sorted_indices.clear();
            list.sorted_dirty = true;
            std::mem::take(&mut list.entries)
        };

        let owned: Vec<DrawableHandle> = entries
            .into_iter()
            .filter(|e| e.owned)
            .map(|e| e.handle)
            .collect();

        if destroy {
            log::debug!("scene: released {} owned drawables", owned.len());
            drop(owned);
            Vec::new()
        } else {
            owned
        }
    }

    /// Exclusive guard for one render pass.
    ///
    /// Mutators block until the guard is dropped, so changes requested during
    /// the pass take effect on the next frame.
    pub fn lock_for_render(&self) -> RenderGuard<'_> {
        RenderGuard { list: self.list.lock() }
    }

    pub fn len(&self) -> usize {
        self.list.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.lock().entries.is_empty()
    }

    pub fn contains(&self, handle: &DrawableHandle) -> bool {
        self.list.lock().position(handle).is_some()
    }

    /// Cloned entries in insertion order.
    pub fn snapshot(&self) -> Vec<SceneEntry> {
        self.list.lock().entries.clone()
    }
}

/// Locked view of the scene held for the duration of a render pass.
pub struct RenderGuard<'a> {
    list: MutexGuard<'a, SceneList>,
}

impl RenderGuard<'_> {
    pub fn len(&self) -> usize {
        self.list.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.entries.is_empty()
    }

    /// Iterates entries back-to-front: by layer, then by insertion.
    pub fn iter_in_paint_order(&mut self) -> impl Iterator<Item = &SceneEntry> {
        if self.list.sorted_dirty {
            self.list.rebuild_sorted_indices();
        }

        let list = &*self.list;
        list.sorted_indices.iter().map(move |&i| &list.entries[i])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use glam::Mat4;

    use super::*;
    use crate::render::{DrawPass, DrawTransform, RenderError};
    use crate::scene::Drawable;

    struct Probe {
        name: &'static str,
        drops: Option<Arc<AtomicUsize>>,
    }

    impl Probe {
        fn handle(name: &'static str) -> DrawableHandle {
            Arc::new(Probe { name, drops: None })
        }

        fn counted(name: &'static str, drops: &Arc<AtomicUsize>) -> DrawableHandle {
            Arc::new(Probe { name, drops: Some(drops.clone()) })
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            if let Some(d) = &self.drops {
                d.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl Drawable for Probe {
        fn model_matrix(&self) -> Mat4 {
            Mat4::IDENTITY
        }

        fn render(&self, _pass: &mut dyn DrawPass, _transform: &DrawTransform) -> Result<(), RenderError> {
            Ok(())
        }

        fn label(&self) -> &str {
            self.name
        }
    }

    fn paint_order(buf: &SceneBuffer) -> Vec<String> {
        let mut guard = buf.lock_for_render();
        guard.iter_in_paint_order().map(|e| e.handle.label().to_owned()).collect()
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let buf = SceneBuffer::new();
        let a = Probe::handle("a");
        buf.add(a.clone(), Layer::DEFAULT).unwrap();
        assert_eq!(buf.add(a.clone(), Layer(3)), Err(SceneError::AlreadyPresent));
        assert_eq!(buf.add_owned(a, Layer::DEFAULT), Err(SceneError::AlreadyPresent));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn paint_order_is_layer_then_insertion() {
        let buf = SceneBuffer::new();
        buf.add(Probe::handle("a"), Layer(1)).unwrap();
        buf.add(Probe::handle("b"), Layer(0)).unwrap();
        buf.add(Probe::handle("c"), Layer(1)).unwrap();
        buf.add(Probe::handle("d"), Layer(-2)).unwrap();

        assert_eq!(paint_order(&buf), ["d", "b", "a", "c"]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let buf = SceneBuffer::new();
        let a = Probe::handle("a");
        buf.add(a.clone(), Layer::DEFAULT).unwrap();

        assert_eq!(buf.remove(&Probe::handle("other")), 0);
        assert_eq!(buf.remove(&a), 1);
        assert_eq!(buf.remove(&a), 0);
        assert!(buf.is_empty());
        assert!(paint_order(&buf).is_empty());
    }

    #[test]
    fn destroying_clear_releases_owned_entries_only() {
        let drops = Arc::new(AtomicUsize::new(0));
        let buf = SceneBuffer::new();

        let kept = Probe::counted("kept", &drops);
        buf.add(kept.clone(), Layer::DEFAULT).unwrap();
        buf.add_owned(Probe::counted("owned", &drops), Layer::DEFAULT).unwrap();

        let returned = buf.clear(true);
        assert!(returned.is_empty());
        assert!(buf.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(kept);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_destroying_clear_returns_owned_handles() {
        let drops = Arc::new(AtomicUsize::new(0));
        let buf = SceneBuffer::new();
        buf.add(Probe::counted("borrowed", &drops), Layer::DEFAULT).unwrap();
        buf.add_owned(Probe::counted("owned", &drops), Layer::DEFAULT).unwrap();

        let returned = buf.clear(false);
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].label(), "owned");
        // The non-owned probe had no other holder.
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn contains_and_snapshot_follow_mutation() {
        let buf = SceneBuffer::new();
        let a = Probe::handle("a");
        let b = Probe::handle("b");
        buf.add(a.clone(), Layer::DEFAULT).unwrap();
        buf.add_owned(b.clone(), Layer(1)).unwrap();

        assert!(buf.contains(&a));
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 2);
        assert!(!snap[0].owned && snap[1].owned);
        assert_eq!(snap[1].key, PaintKey::new(Layer(1), 1));

        buf.remove(&a);
        assert!(!buf.contains(&a));
        assert!(buf.contains(&b));
    }

    #[test]
    fn concurrent_adds_and_render_passes_stay_consistent() {
        let buf = Arc::new(SceneBuffer::new());

        let writers: Vec<_> = (0..2)
            .map(|_| {
                let buf = buf.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let h = Probe::handle("w");
                        buf.add(h.clone(), Layer::DEFAULT).unwrap();
                        if buf.len() % 7 == 0 {
                            buf.remove(&h);
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let buf = buf.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut guard = buf.lock_for_render();
                    let len = guard.len();
                    assert_eq!(guard.iter_in_paint_order().count(), len);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        let mut guard = buf.lock_for_render();
        let keys: Vec<PaintKey> = guard.iter_in_paint_order().map(|e| e.key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
