//! Progressive document viewer.
//!
//! Opens a document through a pluggable [`RenderEngine`], schedules page
//! renders by viewport visibility, bounds rendered-page memory, and reports
//! progress through host-registered event hooks. The render queue and page
//! cache are explicit service objects: hosts construct them and share them
//! between viewer instances via `Arc`.
//!
//! [`RenderEngine`]: paperview_engine::RenderEngine

mod error;
mod events;
mod lifecycle;
mod loader;
mod protection;
mod viewer;
mod viewport;
mod watermark;

pub use error::ViewerError;
pub use events::ViewerEvents;
pub use lifecycle::{Lifecycle, ViewerPhase};
pub use loader::{DocumentLoader, DocumentSource, LoadOutcome, RetryPolicy};
pub use protection::{ProtectionPolicy, ViewerAction};
pub use viewer::{DocumentViewer, ViewerConfig};
pub use viewport::{
    prefetch_page_numbers, ViewMode, ViewportState, ZoomMode, MAX_ZOOM_PERCENT, MIN_ZOOM_PERCENT,
};
pub use watermark::Watermark;
