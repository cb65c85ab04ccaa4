//! Viewport geometry: view modes, zoom, scrolling, visible-page math.
//!
//! Pages are numbered from 1. All layout math is in CSS-style pixels at
//! 100% zoom; the render scale applies zoom on top.

use serde::{Deserialize, Serialize};

/// How pages are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    /// One page at a time; navigation swaps the page.
    SinglePage,
    /// All pages stacked vertically; navigation scrolls.
    #[default]
    ContinuousScroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomMode {
    Percent,
    FitWidth,
    FitPage,
}

pub const MIN_ZOOM_PERCENT: u16 = 25;
pub const MAX_ZOOM_PERCENT: u16 = 400;

/// Scroll/zoom state for one viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub mode: ViewMode,
    pub zoom_mode: ZoomMode,
    pub zoom_percent: u16,
    /// Viewport dimensions in pixels.
    pub width_px: f32,
    pub height_px: f32,
    /// Scroll offset from the top of page 1, continuous mode only.
    pub scroll_offset_px: f32,
    /// Per-page heights at 100% zoom, index 0 = page 1.
    pub page_heights_px: Vec<f32>,
    pub page_spacing_px: f32,
    /// Current page in single-page mode.
    single_page: u32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            zoom_mode: ZoomMode::Percent,
            zoom_percent: 100,
            width_px: 800.0,
            height_px: 1000.0,
            scroll_offset_px: 0.0,
            page_heights_px: Vec::new(),
            page_spacing_px: 16.0,
            single_page: 1,
        }
    }
}

impl ViewportState {
    pub fn new(mode: ViewMode) -> Self {
        Self { mode, ..Self::default() }
    }

    pub fn page_count(&self) -> u32 {
        self.page_heights_px.len() as u32
    }

    /// Zoom as a render scale factor.
    pub fn scale(&self) -> f32 {
        f32::from(self.zoom_percent) / 100.0
    }

    pub fn set_zoom_percent(&mut self, percent: u16) {
        self.zoom_percent = percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT);
        self.zoom_mode = ZoomMode::Percent;
    }

    /// Zoom that makes a page of the given width fill the viewport width.
    pub fn fit_width_percent(&self, page_width_px: f32) -> u16 {
        if page_width_px <= 0.0 {
            return 100;
        }
        let percent = (self.width_px / page_width_px * 100.0).floor() as u16;
        percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT)
    }

    /// Switch to fit-width zoom for the given page width.
    pub fn apply_fit_width(&mut self, page_width_px: f32) {
        self.zoom_percent = self.fit_width_percent(page_width_px);
        self.zoom_mode = ZoomMode::FitWidth;
    }

    /// Switch to fit-page zoom for the given page dimensions.
    pub fn apply_fit_page(&mut self, page_width_px: f32, page_height_px: f32) {
        self.zoom_percent = self.fit_page_percent(page_width_px, page_height_px);
        self.zoom_mode = ZoomMode::FitPage;
    }

    /// Zoom that fits a whole page inside the viewport.
    pub fn fit_page_percent(&self, page_width_px: f32, page_height_px: f32) -> u16 {
        if page_width_px <= 0.0 || page_height_px <= 0.0 {
            return 100;
        }
        let horizontal = self.width_px / page_width_px;
        let vertical = self.height_px / page_height_px;
        let percent = (horizontal.min(vertical) * 100.0).floor() as u16;
        percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT)
    }

    fn scaled_page_height(&self, index: usize) -> f32 {
        self.page_heights_px.get(index).copied().unwrap_or(0.0) * self.scale()
    }

    fn page_start_offset(&self, index: usize) -> f32 {
        let mut offset = 0.0;
        for i in 0..index {
            offset += self.scaled_page_height(i) + self.page_spacing_px;
        }
        offset
    }

    /// Zero-based index of the page occupying a vertical offset.
    fn page_index_at(&self, offset_px: f32) -> usize {
        let mut cursor = 0.0;
        for (index, _) in self.page_heights_px.iter().enumerate() {
            cursor += self.scaled_page_height(index) + self.page_spacing_px;
            if offset_px <= cursor {
                return index;
            }
        }
        self.page_heights_px.len().saturating_sub(1)
    }

    /// Pages currently intersecting the viewport, ascending, 1-based.
    pub fn visible_pages(&self) -> Vec<u32> {
        if self.page_heights_px.is_empty() {
            return Vec::new();
        }

        match self.mode {
            ViewMode::SinglePage => vec![self.single_page],
            ViewMode::ContinuousScroll => {
                let top = self.scroll_offset_px.max(0.0);
                // Keep the bottom edge exclusive so a page ending exactly at
                // the viewport boundary does not count as visible.
                let bottom = (top + self.height_px - 1.0).max(top);
                let first = self.page_index_at(top);
                let last = self.page_index_at(bottom);
                (first..=last).map(|index| index as u32 + 1).collect()
            }
        }
    }

    /// The page considered "current": the one under the viewport center.
    pub fn current_page(&self) -> u32 {
        if self.page_heights_px.is_empty() {
            return 1;
        }
        match self.mode {
            ViewMode::SinglePage => self.single_page,
            ViewMode::ContinuousScroll => {
                let center = self.scroll_offset_px.max(0.0) + self.height_px / 2.0;
                self.page_index_at(center) as u32 + 1
            }
        }
    }

    /// Navigate to a page. Scrolls in continuous mode, swaps the page in
    /// single-page mode. Out-of-range targets are clamped.
    pub fn go_to_page(&mut self, page_number: u32) {
        let page_count = self.page_count().max(1);
        let target = page_number.clamp(1, page_count);
        self.single_page = target;
        if self.mode == ViewMode::ContinuousScroll {
            self.scroll_offset_px = self.page_start_offset(target as usize - 1);
        }
    }

    pub fn scroll_to(&mut self, offset_px: f32) {
        self.scroll_offset_px = offset_px.max(0.0);
        self.single_page = self.current_page();
    }

    /// Switch presentation mode, keeping the same page in view.
    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        let current = self.current_page();
        self.mode = mode;
        self.go_to_page(current);
    }
}

/// Pages worth prefetching around the current one, nearest first.
pub fn prefetch_page_numbers(current: u32, page_count: u32, radius: u32) -> Vec<u32> {
    let mut pages = Vec::with_capacity(radius as usize * 2);
    for distance in 1..=radius {
        if let Some(behind) = current.checked_sub(distance) {
            if behind >= 1 {
                pages.push(behind);
            }
        }
        let ahead = current + distance;
        if ahead <= page_count {
            pages.push(ahead);
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(pages: u32, page_height: f32) -> ViewportState {
        let mut state = ViewportState::new(ViewMode::ContinuousScroll);
        state.page_heights_px = vec![page_height; pages as usize];
        state.height_px = 1000.0;
        state.page_spacing_px = 0.0;
        state
    }

    #[test]
    fn top_of_document_shows_first_pages() {
        let state = viewport(10, 500.0);
        assert_eq!(state.visible_pages(), vec![1, 2]);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn scrolling_moves_the_visible_window() {
        let mut state = viewport(10, 500.0);
        state.scroll_to(1250.0);
        assert_eq!(state.visible_pages(), vec![3, 4, 5]);
        assert_eq!(state.current_page(), 4);
    }

    #[test]
    fn zoom_stretches_layout_heights() {
        let mut state = viewport(10, 500.0);
        state.set_zoom_percent(200);
        // Pages are now 1000px tall; the viewport fits exactly one.
        assert_eq!(state.visible_pages(), vec![1]);
    }

    #[test]
    fn single_page_mode_shows_exactly_one_page() {
        let mut state = viewport(10, 500.0);
        state.set_mode(ViewMode::SinglePage);
        assert_eq!(state.visible_pages(), vec![1]);

        state.go_to_page(7);
        assert_eq!(state.visible_pages(), vec![7]);
        assert_eq!(state.current_page(), 7);
    }

    #[test]
    fn mode_switch_preserves_current_page() {
        let mut state = viewport(10, 500.0);
        state.scroll_to(2000.0);
        let before = state.current_page();

        state.set_mode(ViewMode::SinglePage);
        assert_eq!(state.current_page(), before);

        state.set_mode(ViewMode::ContinuousScroll);
        assert_eq!(state.current_page(), before);
    }

    #[test]
    fn go_to_page_clamps_to_bounds() {
        let mut state = viewport(5, 500.0);
        state.go_to_page(99);
        assert_eq!(state.current_page(), 5);
        state.go_to_page(0);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn fit_width_and_fit_page_zoom() {
        let mut state = viewport(1, 1000.0);
        state.width_px = 1224.0;
        state.height_px = 792.0;

        // 612pt-wide letter page doubles to fill 1224px.
        assert_eq!(state.fit_width_percent(612.0), 200);
        // Fit-page is limited by the shorter axis.
        assert_eq!(state.fit_page_percent(612.0, 792.0), 100);

        state.apply_fit_width(612.0);
        assert_eq!(state.zoom_percent, 200);
        assert_eq!(state.zoom_mode, ZoomMode::FitWidth);

        state.apply_fit_page(612.0, 792.0);
        assert_eq!(state.zoom_percent, 100);
        assert_eq!(state.zoom_mode, ZoomMode::FitPage);
    }

    #[test]
    fn prefetch_is_nearest_first_and_bounded() {
        assert_eq!(prefetch_page_numbers(5, 10, 2), vec![4, 6, 3, 7]);
        assert_eq!(prefetch_page_numbers(1, 10, 2), vec![2, 3]);
        assert_eq!(prefetch_page_numbers(10, 10, 2), vec![9, 8]);
        assert!(prefetch_page_numbers(1, 1, 3).is_empty());
    }
}
