//! The document viewer: ties loading, scheduling, caching, and events
//! together behind one object.
//!
//! A viewer owns its engine but shares the render queue and page cache with
//! other viewers via `Arc`; both are plain service objects handed in at
//! construction. Work is cooperative: nothing renders until the host calls
//! [`DocumentViewer::settle`], which pumps this viewer's queued jobs.

use crate::error::ViewerError;
use crate::events::ViewerEvents;
use crate::lifecycle::{Lifecycle, ViewerPhase};
use crate::loader::{DocumentLoader, DocumentSource, RetryPolicy};
use crate::protection::ProtectionPolicy;
use crate::viewport::{ViewMode, ViewportState};
use crate::watermark::Watermark;
use log::{debug, info, warn};
use paperview_cache::PageCache;
use paperview_engine::{DocumentHandle, RenderEngine, RenderParams};
use paperview_scheduler::{
    CancellationToken, PagePriority, PageState, PageStatus, PriorityAssignor, RenderQueue,
    RenderRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Everything a host configures up front. Changing the source through
/// [`DocumentViewer::update_config`] reloads; changing anything else never
/// does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub source: DocumentSource,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub watermark: Option<Watermark>,
    #[serde(default)]
    pub protection: ProtectionPolicy,
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Retry budget for the document load.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Retry budget for an individual page render.
    #[serde(default = "default_max_page_retries")]
    pub max_page_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_page_retries() -> u32 {
    2
}

impl ViewerConfig {
    pub fn new(source: DocumentSource) -> Self {
        Self {
            source,
            title: None,
            watermark: None,
            protection: ProtectionPolicy::disabled(),
            view_mode: ViewMode::default(),
            max_retries: default_max_retries(),
            max_page_retries: default_max_page_retries(),
        }
    }

    pub fn with_watermark(mut self, watermark: Watermark) -> Self {
        self.watermark = Some(watermark);
        self
    }

    pub fn with_protection(mut self, protection: ProtectionPolicy) -> Self {
        self.protection = protection;
        self
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }
}

/// State shared with queue callbacks.
///
/// Callbacks captured by queued jobs outlive any single load: the generation
/// stamp lets stale completions (prior source, destroyed viewer) detect
/// themselves and return without side effects.
struct SharedState {
    live_generation: u64,
    destroyed: bool,
    page_states: HashMap<u32, PageState>,
    /// Pages whose render failed transiently and still have retry budget.
    retry_pages: Vec<u32>,
}

pub struct DocumentViewer<E: RenderEngine> {
    engine: E,
    queue: Arc<RenderQueue>,
    cache: Arc<PageCache>,
    events: ViewerEvents,
    config: ViewerConfig,
    lifecycle: Lifecycle,
    assignor: PriorityAssignor,
    viewport: ViewportState,
    document: Option<DocumentHandle>,
    page_count: u32,
    current_page: u32,
    generation: u64,
    load_token: Option<CancellationToken>,
    loads_triggered: u64,
    loads_cancelled: u64,
    fallback_active: bool,
    shared: Arc<Mutex<SharedState>>,
}

impl<E: RenderEngine> DocumentViewer<E> {
    pub fn new(
        engine: E,
        queue: Arc<RenderQueue>,
        cache: Arc<PageCache>,
        config: ViewerConfig,
        events: ViewerEvents,
    ) -> Self {
        let viewport = ViewportState::new(config.view_mode);
        Self {
            engine,
            queue,
            cache,
            events,
            config,
            lifecycle: Lifecycle::new(),
            assignor: PriorityAssignor::new(0),
            viewport,
            document: None,
            page_count: 0,
            current_page: 1,
            generation: 0,
            load_token: None,
            loads_triggered: 0,
            loads_cancelled: 0,
            fallback_active: false,
            shared: Arc::new(Mutex::new(SharedState {
                live_generation: 0,
                destroyed: false,
                page_states: HashMap::new(),
                retry_pages: Vec::new(),
            })),
        }
    }

    /// Kick off the initial load. Idempotent: once past `Idle`, repeated
    /// mounts do nothing, so re-running host setup never re-fetches.
    pub fn mount(&mut self) {
        if self.lifecycle.phase() == ViewerPhase::Idle {
            self.start_load();
        }
    }

    /// Apply a new configuration.
    ///
    /// A changed source cancels whatever the previous source still had in
    /// flight and triggers exactly one new load. Every other field (title,
    /// watermark, protection, view mode, budgets) is applied in place.
    pub fn update_config(&mut self, config: ViewerConfig) {
        if self.lifecycle.is_destroyed() {
            return;
        }

        let source_changed = config.source != self.config.source;
        let mode_changed = config.view_mode != self.config.view_mode;
        self.config = config;

        if source_changed {
            info!("source changed to {}", self.config.source.describe());
            self.start_load();
        } else if mode_changed {
            self.set_view_mode(self.config.view_mode);
        }
    }

    fn start_load(&mut self) {
        if !self.lifecycle.advance(ViewerPhase::Loading) {
            return;
        }

        self.cancel_in_flight();
        self.generation += 1;
        self.fallback_active = false;
        {
            let mut shared = self.shared.lock().unwrap();
            shared.live_generation = self.generation;
            shared.page_states.clear();
            shared.retry_pages.clear();
        }

        let token = CancellationToken::new();
        self.load_token = Some(token.clone());
        self.loads_triggered += 1;

        let loader = DocumentLoader::new(RetryPolicy { max_retries: self.config.max_retries });
        match loader.load(&mut self.engine, &self.config.source, &token) {
            Ok(Some(outcome)) => self.install_document(outcome.document, outcome.page_count),
            Ok(None) => {
                // Cancelled mid-load: whoever cancelled owns the lifecycle
                // now. Stay silent.
                debug!("load of {} cancelled", self.config.source.describe());
            }
            Err(err) => {
                if err.is_transient() && self.run_fallback(&token) {
                    return;
                }
                self.lifecycle.advance(ViewerPhase::Error);
                self.events.emit_error(&err);
            }
        }
    }

    fn install_document(&mut self, document: DocumentHandle, page_count: u32) {
        if let Some(old) = self.document.take() {
            let _ = self.engine.close(old);
            self.cache.release_document(old);
        }
        self.document = Some(document);
        self.page_count = page_count;
        self.current_page = 1;
        self.assignor = PriorityAssignor::new(page_count);
        let mut heights = Vec::with_capacity(page_count as usize);
        for page in 1..=page_count {
            let height = match self.engine.page_size(document, page) {
                Ok(size) => size.height_pt,
                Err(_) => 792.0,
            };
            heights.push(height);
        }
        self.viewport = ViewportState::new(self.config.view_mode);
        self.viewport.page_heights_px = heights;

        if self.lifecycle.advance(ViewerPhase::Rendering) {
            self.events.emit_load_complete(page_count);
            self.schedule_visible();
        }
    }

    /// Last-ditch simple path after the progressive load exhausts its
    /// retries: one direct open, render the first page inline, skip the
    /// queue entirely. Keeps a flaky environment from stranding the host
    /// on a spinner.
    fn run_fallback(&mut self, token: &CancellationToken) -> bool {
        let once = DocumentLoader::new(RetryPolicy { max_retries: 0 });
        let outcome = match once.load(&mut self.engine, &self.config.source, token) {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => return false,
        };
        warn!("progressive load failed; falling back to basic single-page mode");

        if let Some(old) = self.document.take() {
            let _ = self.engine.close(old);
            self.cache.release_document(old);
        }
        self.document = Some(outcome.document);
        self.page_count = outcome.page_count;
        self.current_page = 1;
        self.assignor = PriorityAssignor::new(outcome.page_count);
        self.fallback_active = true;

        if !self.lifecycle.advance(ViewerPhase::Rendering) {
            return false;
        }
        self.events.emit_load_complete(outcome.page_count);

        let params = RenderParams { page_number: 1, scale: self.viewport.scale() };
        match self.engine.render_page(outcome.document, params) {
            Ok(mut surface) => {
                if let Some(watermark) = &self.config.watermark {
                    watermark.apply(&mut surface);
                }
                self.cache.add_rendered_page(outcome.document, 1, PagePriority::Immediate, surface);
                self.events.emit_page_rendered(1);
                self.lifecycle.advance(ViewerPhase::Ready);
            }
            Err(err) => {
                let err = ViewerError::from_engine_render(1, err);
                self.lifecycle.advance(ViewerPhase::Error);
                self.events.emit_error(&err);
            }
        }
        true
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.load_token.take() {
            if !token.is_cancelled() {
                token.cancel();
                self.loads_cancelled += 1;
            }
        }
        if let Some(document) = self.document {
            let dropped = self.queue.cancel_document(document);
            if dropped > 0 {
                debug!("cancelled {dropped} pending renders for document {}", document.raw());
            }
        }
    }

    /// Queue renders for the lazy-load set and refresh cache priorities.
    fn schedule_visible(&mut self) {
        let Some(document) = self.document else { return };
        if self.fallback_active {
            return;
        }

        self.cache.prioritize_pages(document, self.assignor.visible());
        self.cache.remove_non_priority_pages(document);

        // Visible pages first: within a priority level the queue is FIFO,
        // so submission order decides who paints first.
        for &page in self.assignor.visible() {
            self.schedule_page(document, page, self.assignor.priority_for(page));
        }
        for page in self.assignor.schedule_set() {
            self.schedule_page(document, page, self.assignor.priority_for(page));
        }
    }

    fn schedule_page(&self, document: DocumentHandle, page: u32, priority: PagePriority) {
        if page < 1 || page > self.page_count {
            return;
        }
        if self.cache.contains(document, page) {
            return;
        }
        if self.queue.is_queued(document, page) {
            // A page can become visible while still waiting at a background
            // priority. Promote the pending job instead of dropping the new
            // priority on the floor.
            if self.queue.upgrade_priority(document, page, priority) {
                let mut shared = self.shared.lock().unwrap();
                if let Some(state) = shared.page_states.get_mut(&page) {
                    state.priority = priority;
                }
            }
            return;
        }

        {
            let mut shared = self.shared.lock().unwrap();
            let state =
                shared.page_states.entry(page).or_insert_with(|| PageState::new(page, priority));
            if matches!(state.status, PageStatus::Loading | PageStatus::Loaded) {
                return;
            }
            state.priority = priority;
            state.mark_loading();
        }

        let request = RenderRequest {
            document,
            page_number: page,
            scale: self.viewport.scale(),
            priority,
            callback: self.render_callback(document),
        };
        self.queue.submit(request);
    }

    /// Completion callback for queued renders. Guarded by the generation
    /// stamp: completions for a replaced source or a destroyed viewer are
    /// silent no-ops.
    fn render_callback(&self, document: DocumentHandle) -> paperview_scheduler::RenderCallback {
        let shared = Arc::clone(&self.shared);
        let cache = Arc::clone(&self.cache);
        let events = self.events.clone();
        let watermark = self.config.watermark.clone();
        let generation = self.generation;
        let max_page_retries = self.config.max_page_retries;

        Arc::new(move |page_number, result| {
            let mut state = shared.lock().unwrap();
            if state.destroyed || state.live_generation != generation {
                return;
            }

            match result {
                Ok(mut surface) => {
                    let priority = state
                        .page_states
                        .get_mut(&page_number)
                        .map(|page| {
                            page.mark_loaded();
                            page.priority
                        })
                        .unwrap_or(PagePriority::Normal);
                    drop(state);

                    if let Some(watermark) = &watermark {
                        watermark.apply(&mut surface);
                    }
                    cache.add_rendered_page(document, page_number, priority, surface);
                    events.emit_page_rendered(page_number);
                }
                Err(engine_err) => {
                    let err = ViewerError::from_engine_render(page_number, engine_err);
                    let retries = state
                        .page_states
                        .get_mut(&page_number)
                        .map(PageState::mark_failed)
                        .unwrap_or(u32::MAX);

                    if err.is_transient() && retries <= max_page_retries {
                        state.retry_pages.push(page_number);
                        drop(state);
                        debug!("page {page_number} failed (attempt {retries}), will retry");
                    } else {
                        drop(state);
                        events.emit_error(&err);
                    }
                }
            }
        })
    }

    /// Pump this viewer's queued renders until none remain, draining
    /// per-page retries as they accumulate. Settles into `Ready` once the
    /// current page is resident.
    pub fn settle(&mut self) {
        if self.lifecycle.is_destroyed() {
            return;
        }
        let Some(document) = self.document else { return };

        loop {
            while self.queue.process_next_for(&self.engine, document).is_some() {}

            let retries = {
                let mut shared = self.shared.lock().unwrap();
                std::mem::take(&mut shared.retry_pages)
            };
            if retries.is_empty() {
                break;
            }

            for page in retries {
                {
                    let mut shared = self.shared.lock().unwrap();
                    if let Some(state) = shared.page_states.get_mut(&page) {
                        // Back to Idle so the page can be queued again.
                        state.status = PageStatus::Idle;
                    }
                }
                self.schedule_page(document, page, self.assignor.priority_for(page));
            }
        }

        if self.lifecycle.phase() == ViewerPhase::Rendering
            && self.cache.contains(document, self.current_page)
        {
            self.lifecycle.advance(ViewerPhase::Ready);
        }
    }

    /// Report which pages the viewport currently shows.
    ///
    /// Updates priorities, trims the cache to the new neighborhood, and
    /// queues any uncached pages in the lazy-load set. The first reported
    /// page becomes the current page.
    pub fn set_visible_pages(&mut self, pages: &[u32]) {
        let current = pages.first().copied().unwrap_or(self.current_page);
        self.apply_visibility(pages, current);
    }

    /// Recompute visibility from the viewport geometry after a scroll.
    pub fn scroll_to(&mut self, offset_px: f32) {
        self.viewport.scroll_to(offset_px);
        let pages = self.viewport.visible_pages();
        let current = self.viewport.current_page();
        self.apply_visibility(&pages, current);
    }

    /// Navigate straight to a page (outline click, page-number input).
    /// The jump target renders ahead of background pages but below the
    /// visible set.
    pub fn jump_to_page(&mut self, page: u32) {
        if self.lifecycle.is_destroyed() || self.document.is_none() {
            return;
        }
        if page < 1 || page > self.page_count {
            return;
        }

        self.viewport.go_to_page(page);
        if let Some(document) = self.document {
            self.schedule_page(document, page, PagePriority::Normal);
        }

        let pages = self.viewport.visible_pages();
        self.apply_visibility(&pages, page);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.lifecycle.is_destroyed() {
            return;
        }
        self.config.view_mode = mode;
        self.viewport.set_mode(mode);
        let pages = self.viewport.visible_pages();
        let current = self.viewport.current_page();
        self.apply_visibility(&pages, current);
    }

    fn apply_visibility(&mut self, pages: &[u32], current: u32) {
        if self.lifecycle.is_destroyed() || self.document.is_none() {
            return;
        }

        self.assignor.record_visible(pages);

        let pending_before = self.queue.len();
        self.schedule_visible();

        if current != self.current_page && current >= 1 && current <= self.page_count {
            self.current_page = current;
            self.events.emit_page_change(current);
        }

        if self.queue.len() > pending_before && self.lifecycle.phase() == ViewerPhase::Ready {
            self.lifecycle.advance(ViewerPhase::Rendering);
        }
    }

    /// Queue background renders for pages around the current one, nearest
    /// first. Low priority, so prefetch never delays visible work.
    pub fn prefetch(&mut self, radius: u32) {
        if self.lifecycle.is_destroyed() || self.fallback_active {
            return;
        }
        let Some(document) = self.document else { return };

        for page in
            crate::viewport::prefetch_page_numbers(self.current_page, self.page_count, radius)
        {
            self.schedule_page(document, page, PagePriority::Low);
        }

        if !self.queue.is_empty() && self.lifecycle.phase() == ViewerPhase::Ready {
            self.lifecycle.advance(ViewerPhase::Rendering);
        }
    }

    /// Recover from a failed load: full reset, then a fresh load attempt.
    /// Safe to call repeatedly; each call starts from the same clean slate.
    pub fn retry(&mut self) {
        if self.lifecycle.phase() != ViewerPhase::Error {
            return;
        }

        if let Some(document) = self.document.take() {
            self.queue.cancel_document(document);
            let _ = self.engine.close(document);
            self.cache.release_document(document);
        }
        {
            let mut shared = self.shared.lock().unwrap();
            shared.page_states.clear();
            shared.retry_pages.clear();
        }
        self.page_count = 0;
        self.current_page = 1;
        self.assignor = PriorityAssignor::new(0);
        self.fallback_active = false;

        self.start_load();
    }

    /// Tear the viewer down. Cancels in-flight work so pending completions
    /// become no-ops, releases the document, and empties this viewer's
    /// cache entries. Terminal and idempotent.
    pub fn destroy(&mut self) {
        if self.lifecycle.is_destroyed() {
            return;
        }

        self.shared.lock().unwrap().destroyed = true;
        self.cancel_in_flight();

        if let Some(document) = self.document.take() {
            let _ = self.engine.close(document);
            self.cache.release_document(document);
        }
        self.lifecycle.advance(ViewerPhase::Destroyed);
        info!("viewer for {} destroyed", self.config.source.describe());
    }

    /// Rendered surface for a page, if resident.
    pub fn rendered_page(&self, page: u32) -> Option<paperview_engine::PageSurface> {
        self.document.and_then(|document| self.cache.get(document, page))
    }

    pub fn phase(&self) -> ViewerPhase {
        self.lifecycle.phase()
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn protection(&self) -> ProtectionPolicy {
        self.config.protection
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// Sorted page numbers of this viewer's document with resident rendered
    /// surfaces.
    pub fn rendered_pages(&self) -> Vec<u32> {
        match self.document {
            Some(document) => self.cache.resident_pages(document),
            None => Vec::new(),
        }
    }

    /// Page numbers currently waiting in the queue for this document.
    pub fn queued_pages(&self) -> Vec<u32> {
        match self.document {
            Some(document) => self.queue.queued_pages(document),
            None => Vec::new(),
        }
    }

    pub fn is_fallback_active(&self) -> bool {
        self.fallback_active
    }

    /// Number of document loads this viewer has started.
    pub fn loads_triggered(&self) -> u64 {
        self.loads_triggered
    }

    /// Number of in-flight loads cancelled by source changes or teardown.
    pub fn loads_cancelled(&self) -> u64 {
        self.loads_cancelled
    }
}

impl<E: RenderEngine> Drop for DocumentViewer<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}
