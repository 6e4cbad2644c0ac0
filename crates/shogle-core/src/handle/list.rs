use std::collections::TryReserveError;

struct Linked<T> {
    value: T,
    prev: Option<u32>,
    next: Option<u32>,
}

struct Slot<T> {
    generation: u32,
    entry: Option<Linked<T>>,
}

/// Slot arena with an intrusive doubly linked list threaded through live
/// entries.
///
/// - insertion links at the head, so iteration runs newest → oldest
/// - a slot is linked if and only if it holds a value
/// - removal bumps the slot generation; stale `(index, generation)` pairs no
///   longer resolve
/// - removal never allocates: the free list always has room for every slot
/// - the slot count never exceeds `max_slots`
pub struct ResourceList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    len: usize,
    max_slots: usize,
}

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceList<T> {
    pub const fn new() -> Self {
        Self::with_max_slots(u32::MAX as usize)
    }

    /// List that fails to insert once `max_slots` slots are in use.
    pub const fn with_max_slots(max_slots: usize) -> Self {
        Self { slots: Vec::new(), free: Vec::new(), head: None, len: 0, max_slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ensures the next [`insert`](Self::insert) cannot fail.
    pub fn try_reserve(&mut self) -> Result<(), TryReserveError> {
        if !self.free.is_empty() {
            return Ok(());
        }
        if self.slots.len() >= self.max_slots {
            return Err(capacity_overflow());
        }
        self.slots.try_reserve(1)?;
        // Keep room to free every slot without reallocating.
        self.free.try_reserve(self.slots.len() + 1 - self.free.len())?;
        Ok(())
    }

    /// Inserts `value` at the head of the list and returns `(index, generation)`.
    pub fn try_insert(&mut self, value: T) -> Result<(u32, u32), (T, TryReserveError)> {
        if let Err(e) = self.try_reserve() {
            return Err((value, e));
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: None });
                index
            }
        };

        let old_head = self.head;
        if let Some(h) = old_head {
            if let Some(e) = self.slots[h as usize].entry.as_mut() {
                e.prev = Some(index);
            }
        }

        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.entry.is_none());
        slot.entry = Some(Linked { value, prev: None, next: old_head });

        self.head = Some(index);
        self.len += 1;
        Ok((index, slot.generation))
    }

    pub fn get(&self, index: u32, generation: u32) -> Option<&T> {
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.entry.as_ref().map(|e| &e.value)
    }

    pub fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.entry.as_mut().map(|e| &mut e.value)
    }

    #[inline]
    pub fn contains(&self, index: u32, generation: u32) -> bool {
        self.get(index, generation).is_some()
    }

    /// Unlinks and returns the value; `None` for stale or unknown handles.
    pub fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        if !self.contains(index, generation) {
            return None;
        }
        Some(self.unlink(index))
    }

    /// Removes the most recently inserted live value.
    pub fn pop_front(&mut self) -> Option<(u32, T)> {
        let head = self.head?;
        Some((head, self.unlink(head)))
    }

    /// Iterates live values from newest to oldest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { list: self, cursor: self.head }
    }

    fn unlink(&mut self, index: u32) -> T {
        let slot = &mut self.slots[index as usize];
        let Some(linked) = slot.entry.take() else {
            unreachable!("unlink of an empty slot");
        };
        let retired = slot.generation == u32::MAX;
        slot.generation = slot.generation.wrapping_add(1);

        match linked.prev {
            Some(p) => {
                if let Some(e) = self.slots[p as usize].entry.as_mut() {
                    e.next = linked.next;
                }
            }
            None => self.head = linked.next,
        }
        if let Some(n) = linked.next {
            if let Some(e) = self.slots[n as usize].entry.as_mut() {
                e.prev = linked.prev;
            }
        }

        // A slot whose generation wrapped is never handed out again.
        if !retired {
            self.free.push(index);
        }
        self.len -= 1;
        linked.value
    }
}

fn capacity_overflow() -> TryReserveError {
    // `TryReserveError` has no public constructor; a request past `isize::MAX`
    // bytes always yields one.
    match Vec::<u8>::new().try_reserve(usize::MAX) {
        Err(e) => e,
        Ok(()) => unreachable!("reserved usize::MAX bytes"),
    }
}

/// Iterator over `(index, generation, value)` from newest to oldest.
pub struct Iter<'a, T> {
    list: &'a ResourceList<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (u32, u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.list.slots[index as usize];
        let entry = slot.entry.as_ref()?;
        self.cursor = entry.next;
        Some((index, slot.generation, &entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &ResourceList<&'static str>) -> Vec<&'static str> {
        list.iter().map(|(_, _, v)| *v).collect()
    }

    #[test]
    fn insert_links_at_head() {
        let mut l = ResourceList::new();
        l.try_insert("a").unwrap();
        l.try_insert("b").unwrap();
        l.try_insert("c").unwrap();
        assert_eq!(values(&l), ["c", "b", "a"]);
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn remove_middle_keeps_list_consistent() {
        let mut l = ResourceList::new();
        let _a = l.try_insert("a").unwrap();
        let (bi, bg) = l.try_insert("b").unwrap();
        let _c = l.try_insert("c").unwrap();

        assert_eq!(l.remove(bi, bg), Some("b"));
        assert_eq!(values(&l), ["c", "a"]);
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn stale_handles_do_not_resolve_or_remove() {
        let mut l = ResourceList::new();
        let (i, g) = l.try_insert("a").unwrap();
        assert_eq!(l.remove(i, g), Some("a"));
        assert_eq!(l.remove(i, g), None);

        // Slot is reused with a new generation.
        let (i2, g2) = l.try_insert("b").unwrap();
        assert_eq!(i2, i);
        assert_ne!(g2, g);
        assert!(l.get(i, g).is_none());
        assert_eq!(l.get(i2, g2), Some(&"b"));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn interleaved_create_destroy_counts_match_traversal() {
        let mut l = ResourceList::new();
        let mut live = Vec::new();
        for round in 0..10 {
            for _ in 0..5 {
                live.push(l.try_insert(round).unwrap());
            }
            // Destroy every other live handle, then destroy one twice.
            let mut keep = Vec::new();
            for (n, (i, g)) in live.drain(..).enumerate() {
                if n % 2 == 0 {
                    assert!(l.remove(i, g).is_some());
                    assert!(l.remove(i, g).is_none());
                } else {
                    keep.push((i, g));
                }
            }
            live = keep;
            assert_eq!(l.len(), live.len());
            assert_eq!(l.iter().count(), live.len());
        }
    }

    #[test]
    fn slot_limit_fails_inserts_but_reuses_freed_slots() {
        let mut l = ResourceList::with_max_slots(2);
        let (i, g) = l.try_insert("a").unwrap();
        l.try_insert("b").unwrap();

        let (value, _) = l.try_insert("c").unwrap_err();
        assert_eq!(value, "c");
        assert_eq!(l.len(), 2);

        l.remove(i, g);
        assert!(l.try_insert("c").is_ok());
        assert_eq!(values(&l), ["c", "b"]);
    }

    #[test]
    fn pop_front_drains_newest_first() {
        let mut l = ResourceList::new();
        l.try_insert("a").unwrap();
        l.try_insert("b").unwrap();
        assert_eq!(l.pop_front().map(|(_, v)| v), Some("b"));
        assert_eq!(l.pop_front().map(|(_, v)| v), Some("a"));
        assert!(l.pop_front().is_none());
        assert!(l.is_empty());
    }
}
