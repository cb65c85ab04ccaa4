//! Shared test doubles: a scriptable in-memory engine and an event recorder.

#![allow(dead_code)]

use paperview_cache::PageCache;
use paperview_engine::{
    DocumentHandle, EngineError, OpenSource, PageSize, PageSurface, RenderEngine, RenderParams,
};
use paperview_scheduler::RenderQueue;
use paperview_viewer::{DocumentSource, DocumentViewer, ViewerConfig, ViewerEvents};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// Mirrors the real backend: handles are unique across engine instances so
// viewers sharing a queue or cache can key work by handle.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

struct EngineInner {
    page_count: u32,
    /// Opens left to fail with a timeout before succeeding.
    open_failures: u32,
    /// Page number -> renders left to fail for that page.
    render_failures: HashMap<u32, u32>,
    opens: u32,
    closes: u32,
    rendered: Vec<u32>,
}

/// In-memory engine with scriptable failures. Clones share state, so tests
/// can keep a handle for assertions after moving one into a viewer.
#[derive(Clone)]
pub struct FakeEngine {
    inner: Arc<Mutex<EngineInner>>,
}

impl FakeEngine {
    pub fn with_pages(page_count: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                page_count,
                open_failures: 0,
                render_failures: HashMap::new(),
                opens: 0,
                closes: 0,
                rendered: Vec::new(),
            })),
        }
    }

    /// Fail the next `count` opens with a timeout.
    pub fn fail_opens(&self, count: u32) {
        self.inner.lock().unwrap().open_failures = count;
    }

    /// Fail the next `count` renders of one page.
    pub fn fail_renders(&self, page: u32, count: u32) {
        self.inner.lock().unwrap().render_failures.insert(page, count);
    }

    pub fn opens(&self) -> u32 {
        self.inner.lock().unwrap().opens
    }

    pub fn closes(&self) -> u32 {
        self.inner.lock().unwrap().closes
    }

    /// Every page render that ran, in execution order.
    pub fn rendered(&self) -> Vec<u32> {
        self.inner.lock().unwrap().rendered.clone()
    }
}

impl RenderEngine for FakeEngine {
    fn open(&mut self, _source: OpenSource) -> Result<DocumentHandle, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.opens += 1;
        if inner.open_failures > 0 {
            inner.open_failures -= 1;
            return Err(EngineError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "simulated fetch timeout",
            )));
        }
        Ok(DocumentHandle::from_raw(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)))
    }

    fn page_count(&self, _document: DocumentHandle) -> Result<u32, EngineError> {
        Ok(self.inner.lock().unwrap().page_count)
    }

    fn page_size(
        &self,
        _document: DocumentHandle,
        _page_number: u32,
    ) -> Result<PageSize, EngineError> {
        Ok(PageSize { width_pt: 612.0, height_pt: 792.0 })
    }

    fn render_page(
        &self,
        _document: DocumentHandle,
        params: RenderParams,
    ) -> Result<PageSurface, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(remaining) = inner.render_failures.get_mut(&params.page_number) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EngineError::Backend("simulated render fault".into()));
            }
        }
        inner.rendered.push(params.page_number);
        Ok(PageSurface::from_pixel(64, 64, image::Rgba([255, 255, 255, 255])))
    }

    fn close(&mut self, _document: DocumentHandle) -> Result<(), EngineError> {
        self.inner.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadComplete(u32),
    PageRendered(u32),
    PageChange(u32),
    Error(String),
}

/// Captures every emitted viewer event for later assertions.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hooks(&self) -> ViewerEvents {
        let load = Arc::clone(&self.events);
        let rendered = Arc::clone(&self.events);
        let changed = Arc::clone(&self.events);
        let errored = Arc::clone(&self.events);
        ViewerEvents::new()
            .on_load_complete(move |count| load.lock().unwrap().push(Event::LoadComplete(count)))
            .on_page_rendered(move |page| {
                rendered.lock().unwrap().push(Event::PageRendered(page))
            })
            .on_page_change(move |page| changed.lock().unwrap().push(Event::PageChange(page)))
            .on_error(move |err| {
                errored.lock().unwrap().push(Event::Error(err.reason_code().to_string()))
            })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn load_completes(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::LoadComplete(count) => Some(count),
                _ => None,
            })
            .collect()
    }

    pub fn pages_rendered(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::PageRendered(page) => Some(page),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Error(code) => Some(code),
                _ => None,
            })
            .collect()
    }
}

/// A viewer plus handles to everything it talks to.
pub struct Harness {
    pub engine: FakeEngine,
    pub queue: Arc<RenderQueue>,
    pub cache: Arc<PageCache>,
    pub recorder: Recorder,
}

impl Harness {
    pub fn new(page_count: u32) -> Self {
        Self {
            engine: FakeEngine::with_pages(page_count),
            queue: Arc::new(RenderQueue::new()),
            cache: Arc::new(PageCache::new(8)),
            recorder: Recorder::new(),
        }
    }

    pub fn with_cache_capacity(page_count: u32, max_pages: usize) -> Self {
        let mut harness = Self::new(page_count);
        harness.cache = Arc::new(PageCache::new(max_pages));
        harness
    }

    pub fn source() -> DocumentSource {
        DocumentSource::path("/docs/report.pdf")
    }

    pub fn viewer(&self, config: ViewerConfig) -> DocumentViewer<FakeEngine> {
        DocumentViewer::new(
            self.engine.clone(),
            Arc::clone(&self.queue),
            Arc::clone(&self.cache),
            config,
            self.recorder.hooks(),
        )
    }
}
