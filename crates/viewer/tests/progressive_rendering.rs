//! Visibility-driven rendering: lazy queueing, priority order, memory
//! bounds, per-page retries, and watermarking.

mod common;

use common::Harness;
use paperview_viewer::{ViewMode, ViewerConfig, ViewerPhase, Watermark};

#[test]
fn only_the_first_page_renders_before_any_scrolling() {
    let harness = Harness::new(50);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));

    viewer.mount();
    // A 50-page document queues nowhere near 50 jobs up front.
    assert_eq!(viewer.queued_pages(), vec![1]);
    assert!(harness.queue.len() < 10);

    viewer.settle();
    assert_eq!(harness.engine.rendered(), vec![1]);
    assert!(viewer.rendered_pages().contains(&1));
    assert!(!viewer.rendered_pages().contains(&50));
    assert_eq!(viewer.phase(), ViewerPhase::Ready);
}

#[test]
fn scrolling_renders_the_new_neighborhood_and_drops_the_old() {
    let harness = Harness::new(50);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    viewer.set_visible_pages(&[25, 26]);
    let mut queued = viewer.queued_pages();
    queued.sort_unstable();
    assert_eq!(queued, vec![24, 25, 26, 27]);
    assert_eq!(viewer.phase(), ViewerPhase::Rendering);
    assert_eq!(viewer.current_page(), 25);

    viewer.settle();
    for page in 24..=27 {
        assert!(viewer.rendered_pages().contains(&page));
    }
    // Page 1 fell out of the keep neighborhood and was released.
    assert!(!viewer.rendered_pages().contains(&1));
    assert_eq!(viewer.phase(), ViewerPhase::Ready);
}

#[test]
fn viewport_scrolling_derives_visibility_from_geometry() {
    let harness = Harness::new(50);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    // Ten 792pt pages (plus spacing) down the document.
    viewer.scroll_to(7_920.0);
    assert_eq!(viewer.current_page(), 11);

    viewer.settle();
    for page in 10..=12 {
        assert!(viewer.rendered_pages().contains(&page));
    }
}

#[test]
fn visible_pages_render_before_background_pages() {
    let harness = Harness::new(50);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    viewer.set_visible_pages(&[10]);
    viewer.settle();

    // Renders after the initial page: the visible page first, neighbors
    // after, nothing outside the lazy-load set at all.
    let rendered = harness.engine.rendered();
    assert_eq!(rendered[0], 1);
    assert_eq!(rendered[1], 10);
    let mut rest = rendered[2..].to_vec();
    rest.sort_unstable();
    assert_eq!(rest, vec![9, 11]);
}

#[test]
fn cache_stays_bounded_while_scrolling() {
    let harness = Harness::with_cache_capacity(50, 3);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    for visible in [5, 15, 25, 35, 45] {
        viewer.set_visible_pages(&[visible]);
        viewer.settle();
        assert!(harness.cache.len() <= 3);
        assert!(viewer.rendered_pages().contains(&visible));
    }
    assert!(harness.cache.stats().evictions > 0);
}

#[test]
fn transient_page_failures_retry_and_recover() {
    let harness = Harness::new(10);
    harness.engine.fail_renders(1, 1);

    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    assert!(viewer.rendered_pages().contains(&1));
    assert!(harness.recorder.errors().is_empty());
    assert_eq!(viewer.phase(), ViewerPhase::Ready);
}

#[test]
fn page_retry_budget_exhaustion_surfaces_one_error() {
    let harness = Harness::new(10);
    harness.engine.fail_renders(2, 10);

    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    viewer.set_visible_pages(&[2]);
    viewer.settle();

    assert_eq!(harness.recorder.errors(), vec!["render-failure"]);
    assert!(!viewer.rendered_pages().contains(&2));
    // Neighbors were unaffected by the failing page.
    assert!(viewer.rendered_pages().contains(&3));
}

#[test]
fn jump_to_page_renders_the_target() {
    let harness = Harness::new(50);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    viewer.jump_to_page(40);
    assert_eq!(viewer.current_page(), 40);
    assert!(harness
        .recorder
        .events()
        .contains(&common::Event::PageChange(40)));

    viewer.settle();
    assert!(viewer.rendered_pages().contains(&40));
}

#[test]
fn jumped_to_page_renders_before_its_neighbors() {
    let harness = Harness::new(50);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    viewer.jump_to_page(40);
    viewer.settle();

    // The jump target becomes visible while already queued at its jump
    // priority; the pending job is promoted so no background neighbor
    // paints ahead of it.
    let rendered = harness.engine.rendered();
    assert_eq!(rendered[0], 1);
    assert_eq!(rendered[1], 40);
    let mut rest = rendered[2..].to_vec();
    rest.sort_unstable();
    assert_eq!(rest, vec![39, 41, 42]);
}

#[test]
fn single_page_mode_schedules_around_the_current_page() {
    let harness = Harness::new(20);
    let config = ViewerConfig::new(Harness::source()).with_view_mode(ViewMode::SinglePage);
    let mut viewer = harness.viewer(config);
    viewer.mount();
    viewer.settle();

    viewer.jump_to_page(5);
    viewer.settle();

    assert_eq!(viewer.current_page(), 5);
    for page in 4..=6 {
        assert!(viewer.rendered_pages().contains(&page));
    }
    assert!(!viewer.rendered_pages().contains(&10));
}

#[test]
fn prefetch_warms_neighbors_without_visible_work() {
    let harness = Harness::new(30);
    let mut viewer = harness.viewer(ViewerConfig::new(Harness::source()));
    viewer.mount();
    viewer.settle();

    viewer.prefetch(2);
    let mut queued = viewer.queued_pages();
    queued.sort_unstable();
    assert_eq!(queued, vec![2, 3]);

    viewer.settle();
    assert!(viewer.rendered_pages().contains(&2));
    assert!(viewer.rendered_pages().contains(&3));
    assert_eq!(viewer.phase(), ViewerPhase::Ready);
}

#[test]
fn watermark_is_stamped_onto_rendered_pages() {
    let harness = Harness::new(3);
    let config = ViewerConfig::new(Harness::source())
        .with_watermark(Watermark::new("CONFIDENTIAL").with_opacity(0.5));
    let mut viewer = harness.viewer(config);
    viewer.mount();
    viewer.settle();

    let surface = viewer.rendered_page(1).unwrap();
    assert!(surface.pixels().any(|pixel| pixel[0] < 255));
}
