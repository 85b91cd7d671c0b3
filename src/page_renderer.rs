//! Page renderer – draws one printable-height slice of content onto a page.

use crate::canvas::PageCanvas;
use crate::error::DrawError;
use crate::geometry::PrintableRect;
use crate::source::ContentSource;

/// Render page `page_index` of `source` into `canvas`.
///
/// The page shows content-space rows `[i × h, (i + 1) × h)` where `h` is the
/// printable height, clipped to the printable rectangle. The graphics state is
/// restored even when the source fails, so a failed page leaves the canvas
/// balanced.
pub fn render_page<S>(
    source: &S,
    printable: &PrintableRect,
    page_index: usize,
    canvas: &mut PageCanvas<'_>,
) -> Result<(), DrawError>
where
    S: ContentSource + ?Sized,
{
    let offset = printable.page_offset(page_index);
    canvas.begin_slice(printable, offset);
    let drawn = source.draw_page(page_index, canvas);
    canvas.end_slice();
    drawn
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use printpdf::PdfDocument;

    use super::*;
    use crate::canvas::{ContentRect, ImageRegistry};

    /// Records the visible region handed to each draw call.
    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<(usize, ContentRect)>>,
        fail: bool,
    }

    impl ContentSource for Recorder {
        fn prepare_layout(&mut self, _: &PrintableRect) {}

        fn page_count(&self) -> Option<usize> {
            Some(3)
        }

        fn draw_page(&self, page_index: usize, canvas: &mut PageCanvas<'_>) -> Result<(), DrawError> {
            assert_eq!(canvas.page_index(), page_index);
            self.seen
                .borrow_mut()
                .push((canvas.page_index(), canvas.visible_region()));
            if self.fail {
                return Err(DrawError::ContextUnavailable("device lost".into()));
            }
            canvas.fill_rect(canvas.visible_region(), [0.9, 0.9, 0.9, 1.0]);
            Ok(())
        }
    }

    const PRINTABLE: PrintableRect = PrintableRect {
        x: 36.0,
        y: 36.0,
        width: 540.0,
        height: 720.0,
    };

    #[test]
    fn each_page_sees_its_own_slice() {
        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let source = Recorder::default();
        for page in 0..3 {
            let mut canvas = PageCanvas::new(&mut doc, &mut images, page, 612.0, 792.0);
            render_page(&source, &PRINTABLE, page, &mut canvas).unwrap();
        }
        let offsets: Vec<(usize, f32)> = source
            .seen
            .borrow()
            .iter()
            .map(|(i, r)| (*i, r.y))
            .collect();
        assert_eq!(offsets, vec![(0, 0.0), (1, 720.0), (2, 1440.0)]);
        assert!(source.seen.borrow().iter().all(|(_, r)| r.height == 720.0));
    }

    #[test]
    fn failure_still_restores_graphics_state() {
        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let source = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut canvas = PageCanvas::new(&mut doc, &mut images, 0, 612.0, 792.0);
        let err = render_page(&source, &PRINTABLE, 0, &mut canvas).unwrap_err();
        assert!(matches!(err, DrawError::ContextUnavailable(_)));
        // save + clip + restore
        assert_eq!(canvas.op_count(), 3);
    }
}
