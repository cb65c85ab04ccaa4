//! Page render scheduling.
//!
//! Three pieces: a [`PriorityAssignor`] that maps viewport visibility to a
//! render priority, a [`RenderQueue`] that executes render requests in
//! priority order, and [`CancellationToken`]s for abandoning in-flight work.
//! The queue is an explicitly owned service object; callers share it via
//! `Arc`, there is no ambient singleton.

mod cancel;
mod priority;
mod queue;
mod visibility;

pub use cancel::CancellationToken;
pub use priority::{PagePriority, PageState, PageStatus};
pub use queue::{JobId, QueueStats, RenderCallback, RenderQueue, RenderRequest};
pub use visibility::PriorityAssignor;
