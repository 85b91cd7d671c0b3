//! Completion dispatch – hands each job's outcome to the caller exactly once.

use std::fmt;

use crate::error::{DispatchError, PrintError};

/// A finished PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Why a job failed, with the last page count it knew about (0 if none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub error: PrintError,
    pub page_count: usize,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RenderFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The single value delivered to a completion callback.
pub type RenderOutcome = Result<RenderedPdf, RenderFailure>;

/// Owns a job's completion callback until it has been invoked.
///
/// Dropping an undelivered dispatcher delivers [`PrintError::Cancelled`], so
/// a host that abandons the render future still hears back once.
pub struct CompletionDispatcher<F>
where
    F: FnOnce(RenderOutcome),
{
    job_id: u64,
    completion: Option<F>,
}

impl<F> CompletionDispatcher<F>
where
    F: FnOnce(RenderOutcome),
{
    pub fn new(job_id: u64, completion: F) -> Self {
        Self {
            job_id,
            completion: Some(completion),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.completion.is_none()
    }

    /// Invoke the callback with `outcome`. A second delivery is a programming
    /// error: it is rejected and the callback is not touched again.
    pub fn deliver(&mut self, outcome: RenderOutcome) -> Result<(), DispatchError> {
        let Some(completion) = self.completion.take() else {
            log::error!("job {}: rejected second completion delivery", self.job_id);
            return Err(DispatchError::AlreadyDelivered(self.job_id));
        };
        match &outcome {
            Ok(pdf) => log::info!(
                "job {}: delivered {} page(s), {} bytes",
                self.job_id,
                pdf.page_count,
                pdf.bytes.len()
            ),
            Err(failure) => log::info!("job {}: delivered failure: {failure}", self.job_id),
        }
        completion(outcome);
        Ok(())
    }
}

impl<F> Drop for CompletionDispatcher<F>
where
    F: FnOnce(RenderOutcome),
{
    fn drop(&mut self) {
        if self.completion.is_some() {
            log::warn!("job {}: abandoned before completion", self.job_id);
            let _ = self.deliver(Err(RenderFailure {
                error: PrintError::Cancelled,
                page_count: 0,
            }));
        }
    }
}
