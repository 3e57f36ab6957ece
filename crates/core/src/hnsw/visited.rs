//! Epoch-stamped visited set for graph traversal.
//!
//! Replaces a per-search `HashSet<u32>` with direct array indexing. Starting a
//! new traversal bumps the epoch instead of zeroing the array.

/// Visited marks indexed by node id. A node counts as visited when its stamp
/// equals the current epoch.
#[derive(Debug, Default)]
pub struct VisitedSet {
    stamps: Vec<u32>,
    epoch: u32,
}

impl VisitedSet {
    /// A cleared set sized for `capacity` nodes.
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0; capacity],
            epoch: 1,
        }
    }

    /// Starts a new traversal over at least `capacity` nodes.
    ///
    /// O(1) unless the array has to grow or the epoch wraps.
    pub fn reset(&mut self, capacity: usize) {
        if capacity > self.stamps.len() {
            self.stamps.resize(capacity, 0);
        }
        if self.epoch == u32::MAX {
            self.stamps.fill(0);
            self.epoch = 1;
        } else {
            self.epoch += 1;
        }
    }

    /// Marks `id` visited. Returns `true` the first time within an epoch.
    #[inline]
    pub fn visit(&mut self, id: u32) -> bool {
        let slot = &mut self.stamps[id as usize];
        if *slot == self.epoch {
            false
        } else {
            *slot = self.epoch;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_and_reset() {
        let mut vs = VisitedSet::new(8);
        assert!(vs.visit(3));
        assert!(!vs.visit(3));
        vs.reset(8);
        assert!(vs.visit(3), "reset must forget previous marks");
    }

    #[test]
    fn test_reset_grows() {
        let mut vs = VisitedSet::default();
        vs.reset(100);
        assert!(vs.visit(99));
    }

    #[test]
    fn test_epoch_wrap_clears_stamps() {
        let mut vs = VisitedSet::new(4);
        vs.epoch = u32::MAX;
        vs.visit(2);
        vs.reset(4);
        assert_eq!(vs.epoch, 1);
        assert!(vs.visit(2));
    }
}
