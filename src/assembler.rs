//! PDF assembler – owns the printpdf document for one job and collects its
//! pages strictly in order.

use printpdf::{PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg};
use serde::{Deserialize, Serialize};

use crate::canvas::{ImageRegistry, PageCanvas};
use crate::error::DrawError;
use crate::geometry::{PageSize, PrintableRect};
use crate::page_renderer::render_page;
use crate::source::ContentSource;

/// Default upper bound on pages per document.
pub const DEFAULT_MAX_PAGES: usize = 2000;

/// Resource limits for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLimits {
    /// Pages beyond this count cannot get a graphics context.
    pub max_pages: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

pub struct PdfAssembler {
    doc: PdfDocument,
    images: ImageRegistry,
    pages: Vec<PdfPage>,
    page_size: PageSize,
    limits: RenderLimits,
}

impl PdfAssembler {
    /// Open a document whose pages all measure `page_size`.
    pub fn new(title: &str, page_size: PageSize, limits: RenderLimits) -> Self {
        Self {
            doc: PdfDocument::new(title),
            images: ImageRegistry::default(),
            pages: Vec::new(),
            page_size,
            limits,
        }
    }

    /// Number of finished pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Create the graphics context for the next page.
    ///
    /// Pages must be requested in order; an out-of-order index or one beyond
    /// [`RenderLimits::max_pages`] has no context.
    pub fn begin_page(&mut self, page_index: usize) -> Result<PageCanvas<'_>, DrawError> {
        if page_index != self.pages.len() {
            return Err(DrawError::ContextUnavailable(format!(
                "page {page_index} requested while page {} is next",
                self.pages.len()
            )));
        }
        if page_index >= self.limits.max_pages {
            return Err(DrawError::ContextUnavailable(format!(
                "page limit of {} reached",
                self.limits.max_pages
            )));
        }
        Ok(PageCanvas::new(
            &mut self.doc,
            &mut self.images,
            page_index,
            self.page_size.width,
            self.page_size.height,
        ))
    }

    /// Draw every page of `source` in ascending order. The first failure
    /// aborts the loop; pages already drawn stay in the (now useless)
    /// assembler and are never saved.
    pub fn render_pages<S>(
        &mut self,
        source: &S,
        printable: &PrintableRect,
        page_count: usize,
    ) -> Result<(), DrawError>
    where
        S: ContentSource + ?Sized,
    {
        for page_index in 0..page_count {
            let mut canvas = self.begin_page(page_index)?;
            render_page(source, printable, page_index, &mut canvas)?;
            let page = canvas.into_page();
            self.pages.push(page);
            log::debug!("rendered page {}/{}", page_index + 1, page_count);
        }
        Ok(())
    }

    /// Finalize the document and return its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        self.doc.with_pages(self.pages);
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        for warning in &warnings {
            log::debug!("printpdf: {warning:?}");
        }
        bytes
    }
}
