//! Pipeline – ties together geometry, layout readiness, page rendering and
//! completion dispatch into a single asynchronous call.

use serde::{Deserialize, Serialize};

use crate::assembler::{PdfAssembler, RenderLimits};
use crate::dispatch::{CompletionDispatcher, RenderFailure, RenderOutcome, RenderedPdf};
use crate::error::{DrawError, PrintError, ReadinessError};
use crate::geometry::{self, PageMargins, PageOrientation, PageSize};
use crate::job::{JobState, RenderJob};
use crate::readiness::{LayoutReadinessGate, ReadinessConfig};
use crate::source::{ContentSource, SourceHandle};

/// Default page margin in points (half an inch).
pub const DEFAULT_MARGIN_PT: f32 = 36.0;

/// Configuration for one print request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Document title embedded in the PDF metadata (default: "viewprint output").
    pub title: String,
    /// Page size in points (default: US Letter).
    pub page_size: PageSize,
    /// Page margins in points (default: 36 on every edge).
    pub margins: PageMargins,
    /// Swaps width/height of `page_size` when it disagrees.
    pub orientation: PageOrientation,
    pub readiness: ReadinessConfig,
    pub limits: RenderLimits,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            title: "viewprint output".to_string(),
            page_size: PageSize::letter(),
            margins: PageMargins::uniform(DEFAULT_MARGIN_PT),
            orientation: PageOrientation::Portrait,
            readiness: ReadinessConfig::default(),
            limits: RenderLimits::default(),
        }
    }
}

impl PrintOptions {
    /// Page size after applying orientation.
    pub fn effective_page_size(&self) -> PageSize {
        self.page_size.oriented(self.orientation)
    }

    /// Create an A4 portrait config.
    pub fn a4() -> Self {
        Self {
            page_size: PageSize::a4(),
            ..Self::default()
        }
    }

    /// Deserialise from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Print `source` to PDF and hand the result to `completion`, exactly once.
///
/// Geometry errors are reported before the first suspension point. The
/// returned future is `!Send` and is meant for a current-thread runtime or a
/// `LocalSet`; `completion` runs on the task that polls it.
pub async fn render<S, F>(options: &PrintOptions, source: SourceHandle<S>, completion: F)
where
    S: ContentSource + ?Sized,
    F: FnOnce(RenderOutcome),
{
    let mut job = RenderJob::new();
    let mut dispatcher = CompletionDispatcher::new(job.id(), completion);

    let outcome = match run_job(&mut job, options, &source).await {
        Ok(pdf) => Ok(pdf),
        Err(error) => {
            transition(&mut job, JobState::Failed);
            Err(RenderFailure {
                error,
                page_count: job.page_count(),
            })
        }
    };
    // First delivery on a fresh dispatcher; it cannot be rejected.
    let _ = dispatcher.deliver(outcome);
}

/// Like [`render`], but returns the outcome instead of calling back.
pub async fn render_to_outcome<S>(options: &PrintOptions, source: SourceHandle<S>) -> RenderOutcome
where
    S: ContentSource + ?Sized,
{
    let mut slot = None;
    render(options, source, |outcome| slot = Some(outcome)).await;
    slot.unwrap_or(Err(RenderFailure {
        error: PrintError::Cancelled,
        page_count: 0,
    }))
}

async fn run_job<S>(
    job: &mut RenderJob,
    options: &PrintOptions,
    source: &SourceHandle<S>,
) -> Result<RenderedPdf, PrintError>
where
    S: ContentSource + ?Sized,
{
    let page_size = options.effective_page_size();
    log::info!(
        "job {}: printing at {}×{} pt",
        job.id(),
        page_size.width,
        page_size.height
    );

    let printable = geometry::resolve(page_size, options.margins)?;
    job.set_geometry(printable);
    transition(job, JobState::GeometryResolved);

    transition(job, JobState::AwaitingLayout);
    let gate = LayoutReadinessGate::new(options.readiness);
    let page_count = gate.wait(source, &printable).await?;
    job.set_page_count(page_count);

    // Held for the whole render loop: no cancellation once rendering starts.
    let source = source
        .upgrade()
        .ok_or(ReadinessError::SourceInvalidated)?;
    transition(job, JobState::Rendering);

    let bytes = {
        let source = source
            .try_borrow()
            .map_err(|_| DrawError::ContextUnavailable("content source is busy".to_string()))?;
        let mut assembler = PdfAssembler::new(&options.title, page_size, options.limits);
        assembler.render_pages(&*source, &printable, page_count)?;
        assembler.finish()
    };

    transition(job, JobState::Assembled);
    Ok(RenderedPdf { bytes, page_count })
}

fn transition(job: &mut RenderJob, next: JobState) {
    let advanced = job.advance(next);
    if let Err(err) = &advanced {
        log::error!(
            "job {}: illegal transition {} → {}",
            job.id(),
            err.from,
            err.to
        );
    }
    debug_assert!(advanced.is_ok(), "illegal job transition {advanced:?}");
}
