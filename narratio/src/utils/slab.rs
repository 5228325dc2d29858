/// Stable handle to a value stored in a [`Slab`].
///
/// A key pairs a slot index with the generation of the value that was
/// inserted there. Once the value is removed the slot's generation moves on,
/// so stale keys (for instance held by a late waker) never alias a newer
/// value that reuses the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: usize,
    generation: u64,
}

/// A single slot of the slab.
struct Entry<T> {
    /// Generation of the current (or next) occupant.
    generation: u64,

    /// The stored value, `None` when the slot is free.
    value: Option<T>,
}

/// A simple generational slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous vector and hands out
/// [`Key`]s that remain valid until the value is removed. Freed slots are
/// reused for later insertions.
///
/// The runtime uses it to own every spawned task future.
pub(crate) struct Slab<T> {
    /// Storage for items.
    entries: Vec<Entry<T>>,

    /// Stack of free indices that can be reused.
    free: Vec<usize>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab with room for `capacity` values before growing.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its key.
    ///
    /// A free slot is reused when available, otherwise the slab grows.
    pub(crate) fn insert(&mut self, value: T) -> Key {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index];
            entry.value = Some(value);

            return Key {
                index,
                generation: entry.generation,
            };
        }

        let index = self.entries.len();
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });

        Key {
            index,
            generation: 0,
        }
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the key is stale or was never issued by this slab.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let entry = self.entries.get_mut(key.index)?;

        if entry.generation != key.generation {
            return None;
        }

        let value = entry.value.take()?;
        entry.generation += 1;

        self.free.push(key.index);
        self.len -= 1;

        Some(value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        let entry = self.entries.get_mut(key.index)?;

        if entry.generation != key.generation {
            return None;
        }

        entry.value.as_mut()
    }

    /// Returns `true` if `key` still refers to a stored value.
    pub(crate) fn contains(&self, key: Key) -> bool {
        self.entries
            .get(key.index)
            .is_some_and(|entry| entry.generation == key.generation && entry.value.is_some())
    }

    /// Number of stored values.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every stored value, returning them in slot order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);

        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Some(value) = entry.value.take() {
                entry.generation += 1;
                self.free.push(index);
                values.push(value);
            }
        }

        self.len = 0;
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut slab = Slab::with_capacity(2);

        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_eq!(slab.len(), 2);
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.remove(a), None);
        assert_eq!(slab.get_mut(b).copied(), Some("b"));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn stale_key_does_not_alias_reused_slot() {
        let mut slab = Slab::with_capacity(1);

        let old = slab.insert(1);
        slab.remove(old);
        let new = slab.insert(2);

        assert!(!slab.contains(old));
        assert!(slab.contains(new));
        assert!(slab.get_mut(old).is_none());
        assert_eq!(slab.remove(old), None);
        assert_eq!(slab.remove(new), Some(2));
    }

    #[test]
    fn drain_empties_the_slab() {
        let mut slab = Slab::with_capacity(4);
        let keys: Vec<_> = (0..3).map(|i| slab.insert(i)).collect();

        assert_eq!(slab.drain(), vec![0, 1, 2]);
        assert_eq!(slab.len(), 0);
        assert!(keys.iter().all(|key| !slab.contains(*key)));
    }
}
