//! Content snapshots – a captured rendering of a web view as positioned boxes.
//!
//! A [`ContentSnapshot`] is the frozen visual output of the view in *content
//! space* (top-left origin, one tall strip as wide as the printable area).
//! [`SnapshotSource`] adapts it to [`ContentSource`]: it paginates by
//! slicing the strip into printable-height pages and draws every box that
//! intersects the requested slice.

use serde::{Deserialize, Serialize};

use crate::canvas::{ContentRect, PageCanvas, TextStyle};
use crate::error::DrawError;
use crate::geometry::{pages_for_height, PrintableRect};
use crate::source::ContentSource;

/// The full rendered content of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    /// Width the content was laid out at, in points.
    pub content_width: f32,
    /// Total rendered height, in points.
    pub content_height: f32,
    /// Top-level boxes, positioned in content space.
    #[serde(default)]
    pub boxes: Vec<ContentBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBox {
    /// Position in content space, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    /// Nested boxes; their coordinates are content-space absolutes too.
    #[serde(default)]
    pub children: Vec<ContentBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default = "TextContent::default_color")]
    pub color: [f32; 4],
    pub line_height: f32,
    #[serde(default)]
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the box (for alignment)
    #[serde(default)]
    pub x_offset: f32,
    /// Y offset from the top of the box
    pub y_offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// `data:` URI with base64 payload.
    pub src: String,
}

impl TextContent {
    fn default_color() -> [f32; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }

    fn style(&self) -> TextStyle {
        TextStyle {
            font_size: self.font_size,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            color: self.color,
        }
    }
}

impl ContentBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }

    fn rect(&self) -> ContentRect {
        ContentRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

impl ContentSnapshot {
    /// Content of the given size with nothing drawn on it.
    pub fn blank(content_width: f32, content_height: f32) -> Self {
        Self {
            content_width,
            content_height,
            boxes: Vec::new(),
        }
    }

    /// Plain text, one line per entry, stacked from the top at `line_height`
    /// spacing. The content height is the height of all lines.
    pub fn from_text_lines<I, T>(content_width: f32, font_size: f32, line_height: f32, lines: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let lines: Vec<TextLine> = lines
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextLine {
                text: text.into(),
                x_offset: 0.0,
                y_offset: i as f32 * line_height,
            })
            .collect();
        let height = lines.len() as f32 * line_height;
        let mut body = ContentBox::new(0.0, 0.0, content_width, height);
        body.text = Some(TextContent {
            lines,
            font_size,
            bold: false,
            italic: false,
            color: TextContent::default_color(),
            line_height,
            underline: false,
        });
        Self {
            content_width,
            content_height: height,
            boxes: vec![body],
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A [`ContentSource`] backed by a [`ContentSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: ContentSnapshot,
    page_count: Option<usize>,
    valid: bool,
}

impl SnapshotSource {
    pub fn new(snapshot: ContentSnapshot) -> Self {
        Self {
            snapshot,
            page_count: None,
            valid: true,
        }
    }

    pub fn snapshot(&self) -> &ContentSnapshot {
        &self.snapshot
    }

    /// Mark the content as gone (e.g. the view navigated away).
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl ContentSource for SnapshotSource {
    fn prepare_layout(&mut self, printable: &PrintableRect) {
        if self.snapshot.content_width > printable.width {
            log::debug!(
                "content is {} pt wide but only {} pt are printable; overflow is clipped",
                self.snapshot.content_width,
                printable.width
            );
        }
        self.page_count = Some(pages_for_height(
            self.snapshot.content_height,
            printable.height,
        ));
    }

    fn page_count(&self) -> Option<usize> {
        self.page_count
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn draw_page(&self, _page_index: usize, canvas: &mut PageCanvas<'_>) -> Result<(), DrawError> {
        let visible = canvas.visible_region();
        for lbox in &self.snapshot.boxes {
            draw_box(canvas, lbox, &visible);
        }
        Ok(())
    }
}

/// Recursively draw a box and its children, skipping anything outside the
/// visible slice.
fn draw_box(canvas: &mut PageCanvas<'_>, lbox: &ContentBox, visible: &ContentRect) {
    let rect = lbox.rect();
    if rect.overlaps_vertically(visible) {
        if let Some(bg) = lbox.background_color {
            canvas.fill_rect(rect, bg);
        }
        if let Some(border) = &lbox.border {
            canvas.stroke_rect(rect, border.width, border.color);
        }
        if let Some(image) = &lbox.image {
            canvas.draw_image(&image.src, rect);
        }
    }

    // Text may overflow its box, so lines are tested individually.
    if let Some(text) = &lbox.text {
        let style = text.style();
        for line in &text.lines {
            let line_rect = ContentRect {
                x: lbox.x + line.x_offset,
                y: lbox.y + line.y_offset,
                width: lbox.width,
                height: text.line_height,
            };
            if line_rect.overlaps_vertically(visible) {
                canvas.text_line(line_rect.x, line_rect.y, &line.text, &style, lbox.width);
            }
        }
    }

    for child in &lbox.children {
        draw_box(canvas, child, visible);
    }
}

#[cfg(test)]
mod tests {
    use printpdf::PdfDocument;

    use super::*;
    use crate::canvas::ImageRegistry;

    const PRINTABLE: PrintableRect = PrintableRect {
        x: 36.0,
        y: 36.0,
        width: 540.0,
        height: 720.0,
    };

    #[test]
    fn paginates_by_printable_height() {
        for (height, pages) in [(2160.0, 3), (721.0, 2), (720.0, 1), (0.0, 0)] {
            let mut source = SnapshotSource::new(ContentSnapshot::blank(540.0, height));
            assert_eq!(source.page_count(), None);
            source.prepare_layout(&PRINTABLE);
            assert_eq!(source.page_count(), Some(pages), "height {height}");
        }
    }

    #[test]
    fn invalidation_is_reported() {
        let mut source = SnapshotSource::new(ContentSnapshot::blank(10.0, 10.0));
        assert!(source.is_valid());
        source.invalidate();
        assert!(!source.is_valid());
        assert_eq!(source.snapshot(), &ContentSnapshot::blank(10.0, 10.0));
    }

    #[test]
    fn text_lines_stack_into_content_height() {
        let snapshot = ContentSnapshot::from_text_lines(540.0, 12.0, 18.0, ["a", "b", "c"]);
        assert_eq!(snapshot.content_height, 54.0);
        let text = snapshot.boxes[0].text.as_ref().unwrap();
        assert_eq!(text.lines[2].y_offset, 36.0);
    }

    #[test]
    fn only_boxes_in_the_slice_are_drawn() {
        let mut first = ContentBox::new(0.0, 100.0, 540.0, 50.0);
        first.background_color = Some([1.0, 0.0, 0.0, 1.0]);
        let mut second = ContentBox::new(0.0, 900.0, 540.0, 50.0);
        second.background_color = Some([0.0, 0.0, 1.0, 1.0]);
        let snapshot = ContentSnapshot {
            content_width: 540.0,
            content_height: 1000.0,
            boxes: vec![first, second],
        };
        let source = SnapshotSource::new(snapshot);

        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let mut counts = Vec::new();
        for page in 0..2 {
            let mut canvas = PageCanvas::new(&mut doc, &mut images, page, 612.0, 792.0);
            canvas.begin_slice(&PRINTABLE, PRINTABLE.page_offset(page));
            let before = canvas.op_count();
            source.draw_page(page, &mut canvas).unwrap();
            counts.push(canvas.op_count() - before);
        }
        // One fill colour + one polygon per page.
        assert_eq!(counts, vec![2, 2]);
    }

    #[test]
    fn snapshot_json_roundtrip_keeps_boxes() {
        let snapshot = ContentSnapshot::from_text_lines(300.0, 10.0, 14.0, ["hello"]);
        let parsed = ContentSnapshot::from_json(&snapshot.to_json()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let json = r#"{
            "content_width": 540,
            "content_height": 100,
            "boxes": [{
                "x": 0, "y": 0, "width": 540, "height": 20,
                "text": {"lines": [{"text": "Hi", "y_offset": 0}], "font_size": 12, "line_height": 16}
            }]
        }"#;
        let snapshot = ContentSnapshot::from_json(json).unwrap();
        let text = snapshot.boxes[0].text.as_ref().unwrap();
        assert_eq!(text.color, [0.0, 0.0, 0.0, 1.0]);
        assert!(!text.bold);
        assert!(snapshot.boxes[0].children.is_empty());
    }
}
