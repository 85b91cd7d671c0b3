//! The content-source capability consumed by the print pipeline.
//!
//! A content source is whatever owns the rendered web content: it can be
//! asked to paginate against a printable rectangle, reports its page count
//! once layout has run, and draws one page's slice into a [`PageCanvas`].
//! The pipeline never owns a source; it holds a [`SourceHandle`] that stops
//! resolving once the owner drops the source.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::canvas::PageCanvas;
use crate::error::DrawError;
use crate::geometry::PrintableRect;

pub trait ContentSource {
    /// Start (or restart) pagination of the content for `printable`.
    ///
    /// Layout may complete later; progress is observed through
    /// [`ContentSource::page_count`].
    fn prepare_layout(&mut self, printable: &PrintableRect);

    /// Page count from the most recent layout pass, or `None` while a pass is
    /// still in flight.
    fn page_count(&self) -> Option<usize>;

    /// `false` once the source can no longer produce content (e.g. its view
    /// navigated away).
    fn is_valid(&self) -> bool {
        true
    }

    /// Draw page `page_index` in content-space coordinates.
    ///
    /// The canvas is already clipped and translated so that content-space
    /// `y = page_index × printable.height` sits at the printable origin;
    /// [`PageCanvas::visible_region`] tells which slice will be visible.
    fn draw_page(&self, page_index: usize, canvas: &mut PageCanvas<'_>) -> Result<(), DrawError>;
}

/// A non-owning reference to a content source.
pub struct SourceHandle<S: ?Sized> {
    inner: Weak<RefCell<S>>,
}

impl<S: ?Sized> SourceHandle<S> {
    pub fn new(source: &Rc<RefCell<S>>) -> Self {
        Self {
            inner: Rc::downgrade(source),
        }
    }

    /// The source, if its owner still holds it.
    pub fn upgrade(&self) -> Option<Rc<RefCell<S>>> {
        self.inner.upgrade()
    }
}

impl<S: ?Sized> Clone for SourceHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ?Sized> From<&Rc<RefCell<S>>> for SourceHandle<S> {
    fn from(source: &Rc<RefCell<S>>) -> Self {
        Self::new(source)
    }
}
