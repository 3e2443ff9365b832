use core::cmp::Ordering;

/// Paint layer. Higher layers appear on top of lower ones.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Layer(pub i32);

impl Layer {
    pub const DEFAULT: Layer = Layer(0);

    #[inline]
    pub const fn new(v: i32) -> Self {
        Self(v)
    }
}

impl From<i32> for Layer {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

/// Stable paint-order key for scene entries.
///
/// Ordering rules:
/// 1) `layer`: ascending (back-to-front)
/// 2) `seq`: ascending (insertion order within a layer)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PaintKey {
    pub layer: Layer,
    /// Insertion sequence; never reused within one buffer.
    pub seq: u64,
}

impl PaintKey {
    #[inline]
    pub const fn new(layer: Layer, seq: u64) -> Self {
        Self { layer, seq }
    }
}

impl Ord for PaintKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.layer
            .cmp(&other.layer)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for PaintKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_dominates_sequence() {
        let back = PaintKey::new(Layer(0), 10);
        let front = PaintKey::new(Layer(1), 0);
        assert!(back < front);
    }

    #[test]
    fn sequence_breaks_ties() {
        assert!(PaintKey::new(Layer(2), 1) < PaintKey::new(Layer(2), 2));
    }
}
