//! Render priorities and per-page tracking state.

/// Render priority for a page.
///
/// The numeric levels are part of the scheduling contract: a visible page's
/// priority is always at least as high as any non-visible page's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PagePriority {
    /// Pages far from the viewport.
    Low = 10,

    /// Explicitly requested one-off renders (jump-to-page).
    Normal = 25,

    /// Visible and immediately-adjacent pages.
    High = 50,

    /// The first page before any visibility has been measured.
    Immediate = 100,
}

impl PagePriority {
    /// Numeric priority level.
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Load status of a tracked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Tracking record for a page in (or near) the visible set.
///
/// Created when a page enters the visible or adjacent set, discarded when it
/// falls far outside the viewport and is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub page_number: u32,
    pub status: PageStatus,
    pub priority: PagePriority,
    pub retry_count: u32,
}

impl PageState {
    pub fn new(page_number: u32, priority: PagePriority) -> Self {
        Self { page_number, status: PageStatus::Idle, priority, retry_count: 0 }
    }

    pub fn mark_loading(&mut self) {
        self.status = PageStatus::Loading;
    }

    pub fn mark_loaded(&mut self) {
        self.status = PageStatus::Loaded;
    }

    /// Record a failed attempt and return the updated retry count.
    pub fn mark_failed(&mut self) -> u32 {
        self.status = PageStatus::Error;
        self.retry_count += 1;
        self.retry_count
    }
}
