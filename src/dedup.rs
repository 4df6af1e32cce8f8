use std::collections::HashSet;

use parking_lot::Mutex;

/// Seen-set of provider place ids for a single engine run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: Mutex<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time `external_id` is offered, `false` afterwards.
    pub fn admit(&self, external_id: &str) -> bool {
        let mut seen = self.seen.lock();
        if seen.contains(external_id) {
            return false;
        }
        seen.insert(external_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn admits_each_id_once() {
        let dedup = Deduplicator::new();
        assert!(dedup.is_empty());
        assert!(dedup.admit("a"));
        assert!(dedup.admit("b"));
        assert!(!dedup.admit("a"));
        assert!(!dedup.admit("b"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn concurrent_admission_is_consistent() {
        let dedup = Arc::new(Deduplicator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| dedup.admit(&format!("place-{i}")))
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert_eq!(dedup.len(), 100);
    }
}
