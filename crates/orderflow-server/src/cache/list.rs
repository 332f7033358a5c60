//! Slab-backed doubly linked list used as the cache recency order.
//!
//! Links are slab indices rather than pointers. Head is the least recently
//! used entry, tail the most recently used. Freed slots are reused.

/// Index of a node in the slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlabIdx(u32);

#[derive(Debug)]
struct SlabNode<T> {
    value: T,
    prev: Option<SlabIdx>,
    next: Option<SlabIdx>,
}

#[derive(Debug)]
pub(crate) struct RecencyList<T> {
    slots: Vec<Option<SlabNode<T>>>,
    free_indices: Vec<u32>,
    head: Option<SlabIdx>,
    tail: Option<SlabIdx>,
    len: usize,
}

impl<T> RecencyList<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_indices: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Appends a value at the MRU end.
    pub(crate) fn push_back(&mut self, value: T) -> SlabIdx {
        let idx = self.alloc_slot(value);
        if let Some(old_tail) = self.tail {
            if let Some(node) = self.node_mut(old_tail) {
                node.next = Some(idx);
            }
            if let Some(node) = self.node_mut(idx) {
                node.prev = Some(old_tail);
            }
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
        self.len += 1;
        idx
    }

    /// Removes and returns the LRU value.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(head)
    }

    /// Unlinks a node and returns its value. `None` for a vacant slot.
    pub(crate) fn remove(&mut self, idx: SlabIdx) -> Option<T> {
        let node = self.slots.get_mut(idx.0 as usize)?.take()?;
        self.link(node.prev, node.next);
        self.free_indices.push(idx.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Moves a node to the MRU end.
    pub(crate) fn move_to_back(&mut self, idx: SlabIdx) {
        if self.tail == Some(idx) {
            return;
        }
        let Some((prev, next)) = self.node_ref(idx).map(|n| (n.prev, n.next)) else {
            return;
        };
        self.link(prev, next);

        let old_tail = self.tail;
        if let Some(tail) = old_tail
            && let Some(node) = self.node_mut(tail)
        {
            node.next = Some(idx);
        }
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
            node.next = None;
        }
        self.tail = Some(idx);
    }

    pub(crate) fn get(&self, idx: SlabIdx) -> Option<&T> {
        self.node_ref(idx).map(|n| &n.value)
    }

    pub(crate) fn get_mut(&mut self, idx: SlabIdx) -> Option<&mut T> {
        self.node_mut(idx).map(|n| &mut n.value)
    }

    /// Iterates from LRU to MRU.
    pub(crate) fn iter(&self) -> RecencyIter<'_, T> {
        RecencyIter {
            list: self,
            current: self.head,
        }
    }

    /// Joins `prev` and `next` around a node being unlinked.
    fn link(&mut self, prev: Option<SlabIdx>, next: Option<SlabIdx>) {
        match prev.and_then(|p| self.node_mut(p)) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
    }

    fn alloc_slot(&mut self, value: T) -> SlabIdx {
        let node = SlabNode {
            value,
            prev: None,
            next: None,
        };
        if let Some(free) = self.free_indices.pop() {
            self.slots[free as usize] = Some(node);
            SlabIdx(free)
        } else {
            let idx = SlabIdx(self.slots.len() as u32);
            self.slots.push(Some(node));
            idx
        }
    }

    #[inline]
    fn node_ref(&self, idx: SlabIdx) -> Option<&SlabNode<T>> {
        self.slots.get(idx.0 as usize)?.as_ref()
    }

    #[inline]
    fn node_mut(&mut self, idx: SlabIdx) -> Option<&mut SlabNode<T>> {
        self.slots.get_mut(idx.0 as usize)?.as_mut()
    }
}

pub(crate) struct RecencyIter<'a, T> {
    list: &'a RecencyList<T>,
    current: Option<SlabIdx>,
}

impl<'a, T> Iterator for RecencyIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node_ref(self.current?)?;
        self.current = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &RecencyList<&'static str>) -> Vec<&'static str> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_and_pop_front() {
        let mut list = RecencyList::with_capacity(4);
        list.push_back("a");
        list.push_back("b");
        list.push_back("c");
        assert_eq!(values(&list), ["a", "b", "c"]);

        assert_eq!(list.pop_front(), Some("a"));
        assert_eq!(values(&list), ["b", "c"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_move_to_back() {
        let mut list = RecencyList::with_capacity(4);
        let a = list.push_back("a");
        let b = list.push_back("b");
        list.push_back("c");

        list.move_to_back(a);
        assert_eq!(values(&list), ["b", "c", "a"]);
        list.move_to_back(a);
        assert_eq!(values(&list), ["b", "c", "a"]);

        list.move_to_back(b);
        assert_eq!(values(&list), ["c", "a", "b"]);
        assert_eq!(list.pop_front(), Some("c"));
    }

    #[test]
    fn test_remove_middle_and_reuse_slot() {
        let mut list = RecencyList::with_capacity(4);
        list.push_back("a");
        let b = list.push_back("b");
        list.push_back("c");

        assert_eq!(list.remove(b), Some("b"));
        assert_eq!(list.remove(b), None);
        assert_eq!(values(&list), ["a", "c"]);

        let d = list.push_back("d");
        assert_eq!(d, b);
        assert_eq!(values(&list), ["a", "c", "d"]);
    }

    #[test]
    fn test_single_element() {
        let mut list = RecencyList::with_capacity(1);
        let a = list.push_back("a");
        list.move_to_back(a);
        assert_eq!(list.get(a), Some(&"a"));
        assert_eq!(list.pop_front(), Some("a"));
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.len(), 0);
    }
}
