use parking_lot::RwLock;

/// In-memory copy of a persisted collection.
///
/// The cache never loads anything itself: the owner fills it after a
/// successful read or write and invalidates it when a write fails, so the next
/// read goes back to storage instead of serving state that was never
/// persisted.
#[derive(Debug)]
pub struct CollectionCache<T> {
    label: &'static str,
    entries: RwLock<Option<Vec<T>>>,
}

impl<T: Clone> CollectionCache<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Vec<T>> {
        let guard = self.entries.read();
        match guard.as_ref() {
            Some(entries) => {
                tracing::debug!(cache = self.label, len = entries.len(), "cache hit");
                Some(entries.clone())
            }
            None => {
                tracing::debug!(cache = self.label, "cache miss");
                None
            }
        }
    }

    pub fn replace(&self, entries: Vec<T>) {
        *self.entries.write() = Some(entries);
    }

    pub fn invalidate(&self) {
        if self.entries.write().take().is_some() {
            tracing::debug!(cache = self.label, "cache invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.read().is_some()
    }
}
