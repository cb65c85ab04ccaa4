//! Bounded cache of rendered pages.

mod page_cache;

pub use page_cache::{CacheStats, CachedPage, PageCache};
