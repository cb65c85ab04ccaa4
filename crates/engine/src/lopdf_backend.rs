//! Default `lopdf`-backed engine.
//!
//! Parses page geometry from the PDF itself but rasterizes placeholder
//! surfaces (white page, border, ruled text lines). Good enough to exercise
//! the scheduling, caching, and reliability layers; a production backend
//! would swap in a real rasterizer behind the same trait.

use crate::{
    DocumentHandle, EngineError, OpenSource, PageSize, PageSurface, RenderEngine, RenderParams,
};
use image::Rgba;
use log::debug;
use lopdf::Document;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

// Handles are allocated process-wide, not per backend instance, so two
// backends never issue the same handle to viewers sharing a queue or cache.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

struct OpenDocument {
    page_sizes: Vec<PageSize>,
    byte_len: usize,
}

#[derive(Default)]
pub struct LopdfBackend {
    docs: HashMap<DocumentHandle, OpenDocument>,
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, EngineError> {
        // Sniff for encryption before handing the bytes to the parser so the
        // caller gets a password-required error rather than a parse failure.
        if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(EngineError::Encrypted);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(LETTER);

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(EngineError::Empty);
        }

        Ok(sizes)
    }

    fn doc(&self, handle: DocumentHandle) -> Result<&OpenDocument, EngineError> {
        self.docs.get(&handle).ok_or(EngineError::InvalidHandle(handle.raw()))
    }
}

impl RenderEngine for LopdfBackend {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, EngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_page_sizes(&bytes)?;
        debug!("opened document: {} pages, {} bytes", page_sizes.len(), bytes.len());

        let handle = DocumentHandle::from_raw(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
        self.docs.insert(handle, OpenDocument { page_sizes, byte_len: bytes.len() });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError> {
        Ok(self.doc(handle)?.page_sizes.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page_number: u32) -> Result<PageSize, EngineError> {
        let doc = self.doc(handle)?;
        let index = page_number.checked_sub(1).ok_or(EngineError::PageOutOfRange {
            page: page_number,
            page_count: doc.page_sizes.len() as u32,
        })?;

        doc.page_sizes.get(index as usize).copied().ok_or(EngineError::PageOutOfRange {
            page: page_number,
            page_count: doc.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        params: RenderParams,
    ) -> Result<PageSurface, EngineError> {
        let _ = self.doc(handle)?.byte_len;
        let page_size = self.page_size(handle, params.page_number)?;
        let scale = if params.scale <= 0.0 { 1.0 } else { params.scale };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut surface = PageSurface::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 8 && height >= 8 {
            let border = Rgba([210, 210, 210, 255]);
            for x in 0..width {
                surface.put_pixel(x, 0, border);
                surface.put_pixel(x, height - 1, border);
            }
            for y in 0..height {
                surface.put_pixel(0, y, border);
                surface.put_pixel(width - 1, y, border);
            }

            // Ruled placeholder text lines so distinct pages are visually
            // distinguishable in the demo binary.
            let line_spacing = ((14.0 * scale).round() as u32).max(4);
            let margin = ((36.0 * scale).round() as u32).min(width / 4);
            let ink = Rgba([170, 170, 170, 255]);
            let mut y = margin + (params.page_number % line_spacing);
            while y + margin < height {
                for x in margin..width.saturating_sub(margin) {
                    surface.put_pixel(x, y, ink);
                }
                y += line_spacing;
            }
        }

        Ok(surface)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError> {
        self.docs
            .remove(&handle)
            .map(|_| ())
            .ok_or(EngineError::InvalidHandle(handle.raw()))
    }
}
