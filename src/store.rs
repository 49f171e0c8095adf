use std::marker::PhantomData;

use crate::{element::Handle, status::Status};

/// Arena of items addressed by handles of type `H`.
///
/// Deleting an item only flags it. The slot is first parked in a pending list,
/// and becomes available for reuse after [`Store::reclaim`]. This keeps the
/// handles stable for the duration of a remeshing pass.
#[derive(Debug, Clone)]
pub(crate) struct Store<H, T> {
    items: Vec<T>,
    status: Vec<Status>,
    pending: Vec<H>,
    free: Vec<H>,
}

impl<H, T> Default for Store<H, T> {
    fn default() -> Self {
        Store {
            items: Vec::new(),
            status: Vec::new(),
            pending: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<H, T> Store<H, T>
where
    H: Handle,
{
    pub(crate) fn with_capacity(n: usize) -> Self {
        Store {
            items: Vec::with_capacity(n),
            status: Vec::with_capacity(n),
            pending: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of slots, including deleted ones.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn num_deleted(&self) -> usize {
        self.pending.len() + self.free.len()
    }

    pub(crate) fn num_live(&self) -> usize {
        self.len() - self.num_deleted()
    }

    pub(crate) fn is_valid(&self, h: H) -> bool {
        (h.index() as usize) < self.items.len()
    }

    pub(crate) fn is_live(&self, h: H) -> bool {
        self.is_valid(h) && !self.status[h.index() as usize].deleted()
    }

    pub(crate) fn get(&self, h: H) -> &T {
        &self.items[h.index() as usize]
    }

    pub(crate) fn get_mut(&mut self, h: H) -> &mut T {
        &mut self.items[h.index() as usize]
    }

    pub(crate) fn status(&self, h: H) -> Status {
        self.status[h.index() as usize]
    }

    pub(crate) fn status_mut(&mut self, h: H) -> &mut Status {
        &mut self.status[h.index() as usize]
    }

    /// Adds an item, reusing a reclaimed slot if one is available.
    pub(crate) fn add(&mut self, item: T) -> H {
        match self.free.pop() {
            Some(h) => {
                let i = h.index() as usize;
                self.items[i] = item;
                self.status[i] = Status::default();
                h
            }
            None => {
                let h = H::from_index(self.items.len() as u32);
                self.items.push(item);
                self.status.push(Status::default());
                h
            }
        }
    }

    /// Flags the item as deleted. Does nothing if it already is.
    pub(crate) fn delete(&mut self, h: H) {
        let status = &mut self.status[h.index() as usize];
        if !status.deleted() {
            status.set_deleted(true);
            self.pending.push(h);
        }
    }

    /// Make the slots of the items deleted so far available for reuse.
    pub(crate) fn reclaim(&mut self) {
        self.free.append(&mut self.pending);
    }

    /// Handles of all the live items, in ascending order.
    pub(crate) fn handles(&self) -> impl Iterator<Item = H> + use<'_, H, T> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.deleted())
            .map(|(i, _)| H::from_index(i as u32))
    }

    /// Removes the deleted items and packs the live items contiguously,
    /// preserving their relative order. Returns the map from the old handles
    /// to the new ones.
    pub(crate) fn compact(&mut self) -> IndexMap<H> {
        let mut map = Vec::with_capacity(self.items.len());
        let mut next = 0u32;
        for s in &self.status {
            if s.deleted() {
                map.push(None);
            } else {
                map.push(Some(next));
                next += 1;
            }
        }
        let mut i = 0usize;
        self.items.retain(|_| {
            let keep = map[i].is_some();
            i += 1;
            keep
        });
        self.status.retain(|s| !s.deleted());
        self.pending.clear();
        self.free.clear();
        IndexMap {
            map,
            _phantom: PhantomData,
        }
    }
}

/// Map from the handles before a compaction to the handles after it. Entities
/// that were deleted map to `None`.
#[derive(Clone, PartialEq, Eq)]
pub struct IndexMap<H> {
    map: Vec<Option<u32>>,
    _phantom: PhantomData<H>,
}

impl<H> std::fmt::Debug for IndexMap<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.map.iter()).finish()
    }
}

impl<H> IndexMap<H>
where
    H: Handle,
{
    /// The map that sends every one of `n` handles to itself.
    pub fn identity(n: usize) -> Self {
        IndexMap {
            map: (0..n as u32).map(Some).collect(),
            _phantom: PhantomData,
        }
    }

    /// Number of handles before the compaction.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The new handle, or `None` if `old` was deleted or out of range.
    pub fn new_index(&self, old: H) -> Option<H> {
        self.map
            .get(old.index() as usize)
            .copied()
            .flatten()
            .map(H::from_index)
    }

    pub fn is_deleted(&self, old: H) -> bool {
        self.new_index(old).is_none()
    }

    /// True if nothing was deleted or renumbered.
    pub fn is_identity(&self) -> bool {
        self.map
            .iter()
            .enumerate()
            .all(|(i, m)| *m == Some(i as u32))
    }

    /// Iterate over pairs of old and new handles.
    pub fn iter(&self) -> impl Iterator<Item = (H, Option<H>)> + use<'_, H> {
        self.map
            .iter()
            .enumerate()
            .map(|(i, m)| (H::from_index(i as u32), m.map(H::from_index)))
    }
}
