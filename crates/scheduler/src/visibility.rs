//! Visibility-driven priority assignment.
//!
//! Maps the currently-visible page set to render priorities: visible and
//! immediately-adjacent pages are High, everything else Low. Until the
//! first visibility measurement arrives (initial mount), page 1 is
//! Immediate so something paints right away.

use crate::priority::PagePriority;

/// Assigns render priorities from viewport visibility.
///
/// Contract: a visible page's priority is always ≥ any non-visible page's.
#[derive(Debug, Clone)]
pub struct PriorityAssignor {
    page_count: u32,
    visible: Vec<u32>,
    measured: bool,
}

impl PriorityAssignor {
    pub fn new(page_count: u32) -> Self {
        Self { page_count, visible: Vec::new(), measured: false }
    }

    /// Record a visibility measurement.
    ///
    /// Out-of-range page numbers are discarded; the set is deduplicated and
    /// kept sorted. An empty measurement still counts as "measured"; a
    /// fully scrolled-out viewport is a valid state.
    pub fn record_visible(&mut self, pages: &[u32]) {
        let mut visible: Vec<u32> =
            pages.iter().copied().filter(|&p| p >= 1 && p <= self.page_count).collect();
        visible.sort_unstable();
        visible.dedup();

        self.visible = visible;
        self.measured = true;
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn visible(&self) -> &[u32] {
        &self.visible
    }

    pub fn is_visible(&self, page_number: u32) -> bool {
        self.visible.binary_search(&page_number).is_ok()
    }

    /// Whether the page borders a visible page.
    pub fn is_adjacent(&self, page_number: u32) -> bool {
        self.visible.iter().any(|&v| {
            page_number == v.saturating_add(1) || (v > 1 && page_number == v - 1)
        })
    }

    /// Priority for a page under the current visibility state.
    pub fn priority_for(&self, page_number: u32) -> PagePriority {
        if !self.measured {
            return if page_number == 1 { PagePriority::Immediate } else { PagePriority::Low };
        }

        if self.is_visible(page_number) || self.is_adjacent(page_number) {
            PagePriority::High
        } else {
            PagePriority::Low
        }
    }

    /// The lazy-load set: pages worth queueing right now.
    ///
    /// Visible pages plus their immediate neighbors, clamped to the
    /// document, sorted and deduplicated. Before the first measurement this
    /// is just page 1. Everything outside this set stays unqueued.
    pub fn schedule_set(&self) -> Vec<u32> {
        if self.page_count == 0 {
            return Vec::new();
        }

        if !self.measured {
            return vec![1];
        }

        let mut set = Vec::with_capacity(self.visible.len() * 3);
        for &page in &self.visible {
            if page > 1 {
                set.push(page - 1);
            }
            set.push(page);
            if page < self.page_count {
                set.push(page + 1);
            }
        }

        set.sort_unstable();
        set.dedup();
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_mount_prioritizes_page_one() {
        let assignor = PriorityAssignor::new(50);

        assert_eq!(assignor.priority_for(1), PagePriority::Immediate);
        assert_eq!(assignor.priority_for(2), PagePriority::Low);
        assert_eq!(assignor.schedule_set(), vec![1]);
    }

    #[test]
    fn visible_and_adjacent_pages_are_high() {
        let mut assignor = PriorityAssignor::new(50);
        assignor.record_visible(&[10, 11]);

        assert_eq!(assignor.priority_for(10), PagePriority::High);
        assert_eq!(assignor.priority_for(11), PagePriority::High);
        assert_eq!(assignor.priority_for(9), PagePriority::High);
        assert_eq!(assignor.priority_for(12), PagePriority::High);
        assert_eq!(assignor.priority_for(1), PagePriority::Low);
        assert_eq!(assignor.priority_for(50), PagePriority::Low);

        assert_eq!(assignor.schedule_set(), vec![9, 10, 11, 12]);
    }

    #[test]
    fn visible_priority_dominates_non_visible() {
        let mut assignor = PriorityAssignor::new(30);
        assignor.record_visible(&[5]);

        let visible_priority = assignor.priority_for(5);
        for page in 1..=30 {
            if !assignor.is_visible(page) {
                assert!(visible_priority >= assignor.priority_for(page));
            }
        }
    }

    #[test]
    fn schedule_set_clamps_to_document_bounds() {
        let mut assignor = PriorityAssignor::new(3);
        assignor.record_visible(&[1]);
        assert_eq!(assignor.schedule_set(), vec![1, 2]);

        assignor.record_visible(&[3]);
        assert_eq!(assignor.schedule_set(), vec![2, 3]);
    }

    #[test]
    fn out_of_range_measurements_are_discarded() {
        let mut assignor = PriorityAssignor::new(5);
        assignor.record_visible(&[0, 2, 2, 9]);

        assert_eq!(assignor.visible(), &[2]);
        assert_eq!(assignor.schedule_set(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_measurement_is_still_a_measurement() {
        let mut assignor = PriorityAssignor::new(5);
        assignor.record_visible(&[]);

        // No Immediate fallback once the viewport has been measured.
        assert_eq!(assignor.priority_for(1), PagePriority::Low);
        assert!(assignor.schedule_set().is_empty());
    }
}
