use rand::prelude::*;
use rand::rngs::StdRng;
use serde_derive::{Deserialize, Serialize};

/// Offset mixed into the seed when deriving child keys, so that the child
/// seeds are not the first draws of the parent's own stream.
const SPLIT_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// An explicit, splittable pseudorandom key.
///
/// A [Key] is a plain seed value. Every function that needs randomness takes
/// a key argument, so the same key always produces the same draws, and no
/// generator state is shared between callers. Independent streams are
/// obtained with [Key::split].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(u64);

impl Key {
    pub fn new(seed: u64) -> Self {
        Key(seed)
    }

    /// The raw seed carried by this key.
    pub fn seed(&self) -> u64 {
        self.0
    }

    /// Derive `n` child keys.
    ///
    /// The children are a pure function of the parent: splitting the same
    /// key twice yields the same children, in the same order.
    pub fn split(&self, n: usize) -> Vec<Key> {
        let mut rng = StdRng::seed_from_u64(self.0 ^ SPLIT_STREAM);
        (0..n).map(|_| Key(rng.random::<u64>())).collect()
    }

    /// Split into exactly two children, the common case of keeping one key
    /// for later and consuming the other now.
    pub fn split2(&self) -> (Key, Key) {
        let mut rng = StdRng::seed_from_u64(self.0 ^ SPLIT_STREAM);
        (Key(rng.random::<u64>()), Key(rng.random::<u64>()))
    }

    /// A generator seeded from this key.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }
}

impl From<u64> for Key {
    fn from(seed: u64) -> Self {
        Key::new(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_key_same_draws() {
        let key = Key::new(347);
        let draw = |key: Key| {
            let mut rng = key.rng();
            (0..5).map(|_| rng.random::<f64>()).collect::<Vec<f64>>()
        };
        let a = draw(key);
        let b = draw(key);
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_is_deterministic() {
        let key = Key::new(22);
        assert_eq!(key.split(8), key.split(8));
        // A longer split extends a shorter one
        assert_eq!(key.split(3)[..], key.split(8)[..3]);
        let (a, b) = key.split2();
        assert_eq!(vec![a, b], key.split(2));
    }

    #[test]
    fn test_split_children_are_distinct() {
        let key = Key::new(0);
        let children = key.split(100);
        let unique: HashSet<Key> = children.iter().copied().collect();
        assert_eq!(unique.len(), 100);
        assert!(!children.contains(&key));
    }

    #[test]
    fn test_children_streams_differ() {
        let (a, b) = Key::new(1).split2();
        let xa: f64 = a.rng().random();
        let xb: f64 = b.rng().random();
        assert_ne!(xa, xb);
    }
}
