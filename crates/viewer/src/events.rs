//! Outbound notification hooks.
//!
//! Hosts register callbacks for the moments they care about; unset hooks
//! are simply skipped. The set is cloned into render callbacks, so the
//! handlers must be `Send + Sync`.

use crate::error::ViewerError;
use std::fmt;
use std::sync::Arc;

type Hook<T> = Option<Arc<dyn Fn(T) + Send + Sync>>;

#[derive(Clone, Default)]
pub struct ViewerEvents {
    load_complete: Hook<u32>,
    page_rendered: Hook<u32>,
    page_change: Hook<u32>,
    error: Option<Arc<dyn Fn(&ViewerError) + Send + Sync>>,
}

impl ViewerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document opened successfully; receives the page count.
    pub fn on_load_complete(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.load_complete = Some(Arc::new(hook));
        self
    }

    /// A page surface finished rendering; receives the page number.
    pub fn on_page_rendered(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.page_rendered = Some(Arc::new(hook));
        self
    }

    /// The current page changed through scrolling or navigation.
    pub fn on_page_change(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.page_change = Some(Arc::new(hook));
        self
    }

    /// A failure surfaced past the retry machinery.
    pub fn on_error(mut self, hook: impl Fn(&ViewerError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(hook));
        self
    }

    pub(crate) fn emit_load_complete(&self, page_count: u32) {
        if let Some(hook) = &self.load_complete {
            hook(page_count);
        }
    }

    pub(crate) fn emit_page_rendered(&self, page_number: u32) {
        if let Some(hook) = &self.page_rendered {
            hook(page_number);
        }
    }

    pub(crate) fn emit_page_change(&self, page_number: u32) {
        if let Some(hook) = &self.page_change {
            hook(page_number);
        }
    }

    pub(crate) fn emit_error(&self, error: &ViewerError) {
        if let Some(hook) = &self.error {
            hook(error);
        }
    }
}

impl fmt::Debug for ViewerEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerEvents")
            .field("load_complete", &self.load_complete.is_some())
            .field("page_rendered", &self.page_rendered.is_some())
            .field("page_change", &self.page_change.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn registered_hooks_fire_with_their_payload() {
        let pages = Arc::new(AtomicU32::new(0));
        let pages_seen = Arc::clone(&pages);

        let events = ViewerEvents::new()
            .on_load_complete(move |count| pages_seen.store(count, Ordering::SeqCst));

        events.emit_load_complete(42);
        assert_eq!(pages.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn unset_hooks_are_ignored() {
        let events = ViewerEvents::new();
        events.emit_load_complete(1);
        events.emit_page_rendered(1);
        events.emit_page_change(1);
        events.emit_error(&ViewerError::PasswordRequired);
    }
}
