use super::handle::Handle;

/// Slot storage for tree nodes.
///
/// A split retires the overflowing node and stores its two halves. Retired slots go on a
/// stack and are handed out again before the arena grows, so the left half of a split
/// usually lands in the slot its predecessor just vacated.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    vacant: Vec<Handle>,
}

enum Slot<T> {
    Live(T),
    Retired,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Number of live nodes.
    pub(crate) const fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Stores a node, reusing the most recently retired slot if there is one.
    ///
    /// # Panics
    ///
    /// Panics if every slot a [`Handle`] can address is live.
    pub(crate) fn store(&mut self, node: T) -> Handle {
        if let Some(handle) = self.vacant.pop() {
            self.slots[handle.to_index()] = Slot::Live(node);
            return handle;
        }
        assert!(
            self.slots.len() <= Handle::MAX,
            "`Arena::store()` - no free slot left ({} live nodes)",
            self.len()
        );
        self.slots.push(Slot::Live(node));
        Handle::from_index(self.slots.len() - 1)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        match self.slots.get(handle.to_index()) {
            Some(Slot::Live(node)) => node,
            _ => panic!("`Arena::get()` - slot {} holds no live node", handle.to_index()),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        match self.slots.get_mut(handle.to_index()) {
            Some(Slot::Live(node)) => node,
            _ => panic!("`Arena::get_mut()` - slot {} holds no live node", handle.to_index()),
        }
    }

    /// Moves a node out of its slot and marks the slot for reuse.
    pub(crate) fn retire(&mut self, handle: Handle) -> T {
        let index = handle.to_index();
        match self.slots.get_mut(index).map(|slot| core::mem::replace(slot, Slot::Retired)) {
            Some(Slot::Live(node)) => {
                self.vacant.push(handle);
                node
            }
            _ => panic!("`Arena::retire()` - slot {index} holds no live node"),
        }
    }
}
