//! Page geometry – page sizes, margins and the printable rectangle.
//!
//! All values are PDF points (1 pt = 1/72 inch). Rectangles use a top-left
//! origin; conversion to PDF's bottom-left origin happens in [`crate::canvas`].

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Physical page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter, 8.5in × 11in.
    pub const fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// A4: 210mm × 297mm = 595.28 × 841.89 points.
    pub const fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    /// The same page turned on its side.
    pub fn landscape(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Apply an orientation: landscape pages are at least as wide as tall.
    pub fn oriented(self, orientation: PageOrientation) -> Self {
        match orientation {
            PageOrientation::Portrait if self.width > self.height => self.landscape(),
            PageOrientation::Landscape if self.width < self.height => self.landscape(),
            _ => self,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::letter()
    }
}

/// Page orientation requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Height ≥ width (default).
    #[default]
    Portrait,
    /// Width > height.
    Landscape,
}

/// Per-edge page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageMargins {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl PageMargins {
    pub const fn new(top: f32, left: f32, bottom: f32, right: f32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    fn all(&self) -> [f32; 4] {
        [self.top, self.left, self.bottom, self.right]
    }
}

/// The part of the page available to content once margins are removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintableRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PrintableRect {
    /// Content-space y at which page `page_index` starts.
    pub fn page_offset(&self, page_index: usize) -> f32 {
        page_index as f32 * self.height
    }
}

/// Derive the printable rectangle for a page size and margins.
pub fn resolve(page: PageSize, margins: PageMargins) -> Result<PrintableRect, GeometryError> {
    let positive = |v: f32| v.is_finite() && v > 0.0;
    if !positive(page.width) || !positive(page.height) {
        return Err(GeometryError::DegeneratePage);
    }
    if margins.all().iter().any(|m| !m.is_finite() || *m < 0.0) {
        return Err(GeometryError::MarginsExceedPage);
    }

    let width = page.width - margins.left - margins.right;
    let height = page.height - margins.top - margins.bottom;
    if width <= 0.0 || height <= 0.0 {
        return Err(GeometryError::MarginsExceedPage);
    }

    Ok(PrintableRect {
        x: margins.left,
        y: margins.top,
        width,
        height,
    })
}

/// Number of `printable_height`-tall slices needed to cover `content_height`.
///
/// Empty, negative or non-finite heights need zero pages.
pub fn pages_for_height(content_height: f32, printable_height: f32) -> usize {
    let usable = |v: f32| v.is_finite() && v > 0.0;
    if !usable(content_height) || !usable(printable_height) {
        return 0;
    }
    (content_height / printable_height).ceil() as usize
}
