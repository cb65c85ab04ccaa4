//! Rendering-engine seam for the viewer.
//!
//! The viewer never parses or rasterizes documents itself; everything past
//! "give me page N at this scale" is delegated to a [`RenderEngine`]
//! implementation. The default backend ([`LopdfBackend`]) parses real PDF
//! page geometry with `lopdf` and rasterizes placeholder page surfaces.

mod lopdf_backend;

pub use lopdf_backend::LopdfBackend;

use image::{ImageBuffer, Rgba};
use std::path::{Path, PathBuf};

/// Rendered page surface in RGBA format.
pub type PageSurface = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Opaque handle to a document owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Mint a handle from a raw id. Backends own the id space and must not
    /// reuse ids across engine instances: the render queue and page cache
    /// are shared between viewers and key their work by handle.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Parameters for a single page rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// 1-based page number.
    pub page_number: u32,

    /// Rasterization scale (1.0 = 72 DPI).
    pub scale: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self { page_number: 1, scale: 1.0 }
    }
}

/// Where a document's bytes come from.
#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("document parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid document handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("document is encrypted and requires a password")]
    Encrypted,
    #[error("document has no pages")]
    Empty,
    #[error("backend error: {0}")]
    Backend(String),
}

/// External rendering engine contract.
///
/// Parsing, layout, and rasterization are this trait's problem; the rest of
/// the workspace only schedules, caches, and supervises calls into it.
pub trait RenderEngine {
    /// Open a document and return a handle for subsequent calls.
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, EngineError>;

    /// Number of pages in the document.
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError>;

    /// Geometry of a page. `page_number` is 1-based.
    fn page_size(&self, handle: DocumentHandle, page_number: u32) -> Result<PageSize, EngineError>;

    /// Rasterize one page into an RGBA surface.
    fn render_page(
        &self,
        handle: DocumentHandle,
        params: RenderParams,
    ) -> Result<PageSurface, EngineError>;

    /// Release the document and all engine-side resources for it.
    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError>;
}
