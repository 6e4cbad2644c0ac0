use core::cmp::Ordering;

/// Stable sort key for commands of one batch.
///
/// Ordering rules:
/// 1) `group`: ascending
/// 2) `order`: ascending (submission order for equal groups)
///
/// Every key of a frame is unique, so an unstable sort is stable in effect
/// and needs no scratch buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SortKey {
    pub group: u32,
    /// Submission index within the frame.
    pub order: u32,
}

impl SortKey {
    #[inline]
    pub const fn new(group: u32, order: u32) -> Self {
        Self { group, order }
    }
}

impl Ord for SortKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        match self.group.cmp(&other.group) {
            Ordering::Equal => self.order.cmp(&other.order),
            o => o,
        }
    }
}

impl PartialOrd for SortKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_dominates_order() {
        assert!(SortKey::new(0, 9) < SortKey::new(1, 0));
        assert!(SortKey::new(1, 0) < SortKey::new(1, 1));
    }

    #[test]
    fn unstable_sort_keeps_submission_order_for_ties() {
        let groups = [2, 0, 1, 0, 1, 2, 0];
        let mut keys: Vec<SortKey> = groups
            .iter()
            .enumerate()
            .map(|(i, &g)| SortKey::new(g, i as u32))
            .collect();
        keys.sort_unstable();
        let orders: Vec<u32> = keys.iter().map(|k| k.order).collect();
        assert_eq!(orders, [1, 3, 6, 2, 4, 0, 5]);
    }
}
