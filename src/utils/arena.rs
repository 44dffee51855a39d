//! Generational storage
//!
//! Objects that are referenced from other objects with an independent lifetime
//! (a grab referencing the surface it moves, a popup stack referencing its popups)
//! are stored in an [`Arena`] and referenced by [`Index`]. Removing an object bumps
//! the generation of its slot, so an index held by someone else stops resolving
//! instead of silently pointing at whatever gets stored in the slot next.

use std::fmt;

/// A generational index into an [`Arena`]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Index {
    slot: u32,
    generation: u32,
}

impl Index {
    /// Slot part of the index
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation part of the index
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({}v{})", self.slot, self.generation)
    }
}

#[derive(Debug)]
enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Storage handing out generational [`Index`]es
#[derive(Debug)]
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<T> Arena<T> {
    /// Create a new empty arena
    pub fn new() -> Self {
        Arena {
            entries: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live values
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value, returning its index
    pub fn insert(&mut self, value: T) -> Index {
        self.len += 1;
        match self.free_head {
            Some(slot) => {
                let entry = &mut self.entries[slot as usize];
                let (generation, next_free) = match *entry {
                    Entry::Vacant {
                        generation,
                        next_free,
                    } => (generation, next_free),
                    Entry::Occupied { .. } => unreachable!("free list points to an occupied slot"),
                };
                *entry = Entry::Occupied { generation, value };
                self.free_head = next_free;
                Index { slot, generation }
            }
            None => {
                let slot = self.entries.len() as u32;
                self.entries.push(Entry::Occupied { generation: 0, value });
                Index { slot, generation: 0 }
            }
        }
    }

    /// Access a value, if the index is still valid
    pub fn get(&self, index: Index) -> Option<&T> {
        match self.entries.get(index.slot as usize) {
            Some(Entry::Occupied { generation, value }) if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Mutably access a value, if the index is still valid
    pub fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        match self.entries.get_mut(index.slot as usize) {
            Some(Entry::Occupied { generation, value }) if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Whether the index still refers to a live value
    pub fn contains(&self, index: Index) -> bool {
        self.get(index).is_some()
    }

    /// Remove a value, invalidating its index
    pub fn remove(&mut self, index: Index) -> Option<T> {
        let entry = self.entries.get_mut(index.slot as usize)?;
        match entry {
            Entry::Occupied { generation, .. } if *generation == index.generation => {}
            _ => return None,
        }
        let next = Entry::Vacant {
            generation: index.generation.wrapping_add(1),
            next_free: self.free_head,
        };
        let Entry::Occupied { value, .. } = std::mem::replace(entry, next) else {
            unreachable!()
        };
        self.free_head = Some(index.slot);
        self.len -= 1;
        Some(value)
    }

    /// Iterate over all live values
    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.entries.iter().enumerate().filter_map(|(slot, entry)| match entry {
            Entry::Occupied { generation, value } => Some((
                Index {
                    slot: slot as u32,
                    generation: *generation,
                },
                value,
            )),
            Entry::Vacant { .. } => None,
        })
    }

    /// Mutably iterate over all live values
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Entry::Occupied { generation, value } => Some((
                    Index {
                        slot: slot as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Entry::Vacant { .. } => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn stale_index_does_not_resolve() {
        let mut arena = Arena::new();
        let first = arena.insert("first");
        assert_eq!(arena.remove(first), Some("first"));

        let second = arena.insert("second");
        // the slot is reused, the generation is not
        assert_eq!(first.slot(), second.slot());
        assert_ne!(first, second);
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.get(second), Some(&"second"));
        assert_eq!(arena.remove(first), None);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn iteration_skips_vacant_slots() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let c = arena.insert(3);
        arena.remove(b);

        let live: Vec<_> = arena.iter().map(|(idx, v)| (idx, *v)).collect();
        assert_eq!(live, vec![(a, 1), (c, 3)]);

        for (_, value) in arena.iter_mut() {
            *value *= 10;
        }
        assert_eq!(arena.get(c), Some(&30));
        assert!(!arena.is_empty());
    }
}
