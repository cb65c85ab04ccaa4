//! Document loading with bounded retry and cooperative cancellation.

use crate::error::ViewerError;
use log::{info, warn};
use paperview_engine::{DocumentHandle, OpenSource, RenderEngine};
use paperview_scheduler::CancellationToken;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
}

impl DocumentSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        DocumentSource::Path(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        DocumentSource::Url(url.into())
    }

    pub fn describe(&self) -> String {
        match self {
            DocumentSource::Path(path) => path.display().to_string(),
            DocumentSource::Url(url) => url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. Transient failures only.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// A successfully opened document.
#[derive(Debug, Clone, Copy)]
pub struct LoadOutcome {
    pub document: DocumentHandle,
    pub page_count: u32,
    pub attempts: u32,
}

/// Opens documents, absorbing transient failures up to the retry budget.
///
/// Structural failures (bad format, missing file, password) are surfaced
/// on the first occurrence. A cancelled token turns the whole load into a
/// silent no-op: `Ok(None)`, no partial state, no callbacks owed.
#[derive(Debug, Default)]
pub struct DocumentLoader {
    policy: RetryPolicy,
}

impl DocumentLoader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn load(
        &self,
        engine: &mut dyn RenderEngine,
        source: &DocumentSource,
        token: &CancellationToken,
    ) -> Result<Option<LoadOutcome>, ViewerError> {
        let mut attempts = 0;
        loop {
            if token.is_cancelled() {
                return Ok(None);
            }
            attempts += 1;

            match self.try_open(engine, source) {
                Ok((document, page_count)) => {
                    if token.is_cancelled() {
                        // Cancelled while opening; abandon the handle.
                        let _ = engine.close(document);
                        return Ok(None);
                    }
                    info!(
                        "opened {} ({page_count} pages, attempt {attempts})",
                        source.describe()
                    );
                    return Ok(Some(LoadOutcome { document, page_count, attempts }));
                }
                Err(err) if err.is_transient() && attempts <= self.policy.max_retries => {
                    warn!(
                        "load attempt {attempts} for {} failed ({}), retrying",
                        source.describe(),
                        err.reason_code()
                    );
                }
                Err(err) => {
                    warn!("load of {} failed: {}", source.describe(), err.reason_code());
                    return Err(err);
                }
            }
        }
    }

    fn try_open(
        &self,
        engine: &mut dyn RenderEngine,
        source: &DocumentSource,
    ) -> Result<(DocumentHandle, u32), ViewerError> {
        let open_source = match source {
            DocumentSource::Path(path) => OpenSource::Path(path.clone()),
            DocumentSource::Url(url) => {
                // No remote fetcher is wired in; surfacing this as a
                // structural failure avoids pointless retries.
                return Err(ViewerError::EngineUnavailable(format!(
                    "no loader available for remote source {url}"
                )));
            }
        };

        let document = engine.open(open_source).map_err(ViewerError::from_engine_open)?;
        let page_count = engine.page_count(document).map_err(ViewerError::from_engine_open)?;
        Ok((document, page_count))
    }
}
