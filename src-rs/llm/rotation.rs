use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin over a fixed list of API keys.
pub struct Rotator {
    keys: Vec<String>,
    next: AtomicUsize,
}

impl Rotator {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        Some(self.keys[idx % self.keys.len()].clone())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
