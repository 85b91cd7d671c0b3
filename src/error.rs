//! Error taxonomy for print jobs.
//!
//! Every error is terminal for the job that raised it. Errors are grouped by
//! the pipeline stage that detects them so callers can tell bad input apart
//! from layout trouble and from resource failures during drawing.

use thiserror::Error;

/// Invalid page geometry, detected before any asynchronous work begins.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("page size must be positive and finite")]
    DegeneratePage,
    #[error("margins leave no printable area on the page")]
    MarginsExceedPage,
}

/// Failures while waiting for the content's layout to settle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("layout did not stabilise within the observation budget")]
    LayoutTimeout,
    #[error("content laid out to zero pages")]
    EmptyContent,
    #[error("content source was released before layout settled")]
    SourceInvalidated,
}

/// Resource failures while drawing a page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
}

/// Any failure a print job can end with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    /// The job was dropped by its host before reaching a terminal state.
    #[error("print job was abandoned before completion")]
    Cancelled,
}

impl PrintError {
    /// Stable numeric code for the C ABI. `0` is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            PrintError::Geometry(GeometryError::DegeneratePage) => 10,
            PrintError::Geometry(GeometryError::MarginsExceedPage) => 11,
            PrintError::Readiness(ReadinessError::LayoutTimeout) => 20,
            PrintError::Readiness(ReadinessError::EmptyContent) => 21,
            PrintError::Readiness(ReadinessError::SourceInvalidated) => 22,
            PrintError::Draw(DrawError::ContextUnavailable(_)) => 30,
            PrintError::Cancelled => 40,
        }
    }
}

/// Misuse of a [`crate::dispatch::CompletionDispatcher`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("completion for job {0} was already delivered")]
    AlreadyDelivered(u64),
}
