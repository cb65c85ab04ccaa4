//! Memory manager for rendered page surfaces.
//!
//! Bounds the number of simultaneously cached rendered pages. Under
//! pressure the lowest-priority (then oldest) resident page is evicted
//! first, and a currently-visible page is never evicted. Residents are
//! keyed by document, and the keep and visible sets are tracked per
//! document, so viewers sharing one cache via `Arc` never see or evict
//! each other's state by accident. The capacity bound is global.

use log::{debug, trace};
use paperview_engine::{DocumentHandle, PageSurface};
use paperview_scheduler::PagePriority;
use std::collections::HashMap;
use std::sync::Mutex;

/// A resident rendered page.
#[derive(Clone)]
pub struct CachedPage {
    pub page_number: u32,
    pub priority: PagePriority,
    pub surface: PageSurface,

    /// Insertion sequence; ties in eviction priority break oldest-first.
    sequence: u64,
}

/// Cache usage statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub resident_pages: usize,
    pub max_pages: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct DocumentEntry {
    pages: HashMap<u32, CachedPage>,
    /// Pages to keep resident, as computed by the last `prioritize_pages`.
    keep: Vec<u32>,
    /// Currently-visible pages; never eviction candidates.
    visible: Vec<u32>,
}

struct CacheState {
    documents: HashMap<DocumentHandle, DocumentEntry>,
    sequence: u64,
    stats: CacheStats,
}

impl CacheState {
    fn total_resident(&self) -> usize {
        self.documents.values().map(|entry| entry.pages.len()).sum()
    }

    fn evictable(&self) -> Option<(DocumentHandle, u32)> {
        self.documents
            .iter()
            .flat_map(|(&document, entry)| {
                entry
                    .pages
                    .values()
                    .filter(|page| entry.visible.binary_search(&page.page_number).is_err())
                    .map(move |page| (document, page))
            })
            .min_by_key(|(_, page)| (page.priority, page.sequence))
            .map(|(document, page)| (document, page.page_number))
    }

    fn evict_over_capacity(&mut self, max_pages: usize) {
        while self.total_resident() > max_pages {
            let Some((document, victim)) = self.evictable() else {
                // Everything resident is visible; the bound yields rather
                // than blanking pages the user is looking at.
                break;
            };
            if let Some(entry) = self.documents.get_mut(&document) {
                entry.pages.remove(&victim);
            }
            self.stats.evictions += 1;
            trace!("evicted page {victim} of document {} under capacity pressure", document.raw());
        }
        self.stats.resident_pages = self.total_resident();
    }
}

/// Bounded, priority-aware cache of rendered pages.
pub struct PageCache {
    max_pages: usize,
    state: Mutex<CacheState>,
}

impl PageCache {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
            state: Mutex::new(CacheState {
                documents: HashMap::new(),
                sequence: 0,
                stats: CacheStats { max_pages: max_pages.max(1), ..CacheStats::default() },
            }),
        }
    }

    /// Insert a rendered page, evicting low-priority pages if the count
    /// bound would be exceeded.
    pub fn add_rendered_page(
        &self,
        document: DocumentHandle,
        page_number: u32,
        priority: PagePriority,
        surface: PageSurface,
    ) {
        let mut state = self.state.lock().unwrap();

        state.sequence += 1;
        let sequence = state.sequence;
        state
            .documents
            .entry(document)
            .or_default()
            .pages
            .insert(page_number, CachedPage { page_number, priority, surface, sequence });

        state.evict_over_capacity(self.max_pages);
    }

    /// Fetch a resident page surface. Records hit/miss statistics.
    pub fn get(&self, document: DocumentHandle, page_number: u32) -> Option<PageSurface> {
        let mut state = self.state.lock().unwrap();
        match state.documents.get(&document).and_then(|entry| entry.pages.get(&page_number)) {
            Some(page) => {
                let surface = page.surface.clone();
                state.stats.hits += 1;
                Some(surface)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Residency check without touching statistics.
    pub fn contains(&self, document: DocumentHandle, page_number: u32) -> bool {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(&document)
            .is_some_and(|entry| entry.pages.contains_key(&page_number))
    }

    /// Recompute a document's keep set from its visible pages and return it.
    ///
    /// The keep set is the visible pages plus their immediate neighbors.
    /// Resident pages inside the keep set are re-tagged High, everything
    /// else Low, so subsequent capacity evictions drop distant pages first.
    /// Other documents' residents are untouched.
    pub fn prioritize_pages(&self, document: DocumentHandle, visible: &[u32]) -> Vec<u32> {
        let mut state = self.state.lock().unwrap();

        let mut visible: Vec<u32> = visible.iter().copied().filter(|&p| p >= 1).collect();
        visible.sort_unstable();
        visible.dedup();

        let mut keep = Vec::with_capacity(visible.len() * 3);
        for &page in &visible {
            if page > 1 {
                keep.push(page - 1);
            }
            keep.push(page);
            keep.push(page + 1);
        }
        keep.sort_unstable();
        keep.dedup();

        let entry = state.documents.entry(document).or_default();
        for page in entry.pages.values_mut() {
            page.priority = if keep.binary_search(&page.page_number).is_ok() {
                PagePriority::High
            } else {
                PagePriority::Low
            };
        }

        entry.visible = visible;
        entry.keep = keep.clone();
        keep
    }

    /// Evict a document's pages outside its keep set. Returns the number
    /// removed.
    ///
    /// After this call only that document's prioritized pages remain
    /// resident; visible pages are inside the keep set by construction and
    /// thus untouched.
    pub fn remove_non_priority_pages(&self, document: DocumentHandle) -> usize {
        let mut state = self.state.lock().unwrap();

        let Some(entry) = state.documents.get_mut(&document) else { return 0 };
        let before = entry.pages.len();
        let keep = std::mem::take(&mut entry.keep);
        entry.pages.retain(|page_number, _| keep.binary_search(page_number).is_ok());
        entry.keep = keep;

        let removed = before - entry.pages.len();
        state.stats.evictions += removed as u64;
        state.stats.resident_pages = state.total_resident();

        if removed > 0 {
            debug!("dropped {removed} non-priority pages of document {}", document.raw());
        }
        removed
    }

    /// Drop every resident page and tracking set for one document. Returns
    /// the number of pages released. Other documents are untouched.
    pub fn release_document(&self, document: DocumentHandle) -> usize {
        let mut state = self.state.lock().unwrap();
        let released = state
            .documents
            .remove(&document)
            .map(|entry| entry.pages.len())
            .unwrap_or(0);
        state.stats.resident_pages = state.total_resident();

        if released > 0 {
            debug!("released {released} pages of document {}", document.raw());
        }
        released
    }

    /// Total resident pages across all documents.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().total_resident()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Sorted list of a document's resident page numbers.
    pub fn resident_pages(&self, document: DocumentHandle) -> Vec<u32> {
        let state = self.state.lock().unwrap();
        let mut pages: Vec<u32> = state
            .documents
            .get(&document)
            .map(|entry| entry.pages.keys().copied().collect())
            .unwrap_or_default();
        pages.sort_unstable();
        pages
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap();
        let mut stats = state.stats;
        stats.resident_pages = state.total_resident();
        stats
    }
}
