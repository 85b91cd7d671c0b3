//! Page canvas – the per-page PDF graphics context handed to content sources.
//!
//! A [`PageCanvas`] records printpdf (v0.8 ops-based API) operations for one
//! page. Content sources draw in *content space*: origin at the top-left of
//! the content, y growing downwards. The canvas maps those coordinates onto
//! the page (PDF origin at bottom-left) using the window installed by
//! [`crate::page_renderer`].

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;
use sha2::{Digest, Sha256};

use crate::geometry::PrintableRect;

/// RGBA colour with components in `0.0..=1.0`. Alpha is ignored by PDF fills.
pub type Rgba = [f32; 4];

/// Styling for one line of builtin-font (Helvetica family) text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Rgba,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            bold: false,
            italic: false,
            underline: false,
            color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// A rectangle in content space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ContentRect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether the two rectangles share any vertical span.
    pub fn overlaps_vertically(&self, other: &ContentRect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }
}

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Images registered with one document, keyed by SHA-256 of the encoded bytes.
///
/// Failed decodes are remembered as `None` so a broken image used on every
/// page is reported once.
#[derive(Default)]
pub(crate) struct ImageRegistry {
    by_digest: HashMap<[u8; 32], Option<ImageResource>>,
}

impl ImageRegistry {
    fn resolve(&mut self, doc: &mut PdfDocument, bytes: &[u8]) -> Option<&ImageResource> {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        self.by_digest
            .entry(digest)
            .or_insert_with(|| register_image(doc, bytes))
            .as_ref()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.by_digest.values().filter(|r| r.is_some()).count()
    }
}

fn register_image(doc: &mut PdfDocument, bytes: &[u8]) -> Option<ImageResource> {
    // Decode with the `image` crate to obtain pixel dimensions.
    let dyn_img = match ::image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            log::warn!("Skipping image: decode error: {e}");
            return None;
        }
    };
    let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = match RawImage::decode_from_bytes(bytes, &mut warnings) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Skipping image: PDF encode error: {e}");
            return None;
        }
    };
    Some(ImageResource {
        xobj_id: doc.add_image(&raw),
        px_width,
        px_height,
    })
}

/// Where the current page's slice of content lands on the page.
#[derive(Debug, Clone, Copy)]
struct ContentWindow {
    /// Page position (top-left origin) of content-space `(0, offset)`.
    origin_x: f32,
    origin_y: f32,
    offset: f32,
    width: f32,
    height: f32,
}

/// Graphics context for a single PDF page.
pub struct PageCanvas<'a> {
    doc: &'a mut PdfDocument,
    images: &'a mut ImageRegistry,
    ops: Vec<Op>,
    page_index: usize,
    page_width: f32,
    page_height: f32,
    window: ContentWindow,
}

impl<'a> PageCanvas<'a> {
    pub(crate) fn new(
        doc: &'a mut PdfDocument,
        images: &'a mut ImageRegistry,
        page_index: usize,
        page_width: f32,
        page_height: f32,
    ) -> Self {
        Self {
            doc,
            images,
            ops: Vec::new(),
            page_index,
            page_width,
            page_height,
            window: ContentWindow {
                origin_x: 0.0,
                origin_y: 0.0,
                offset: 0.0,
                width: page_width,
                height: page_height,
            },
        }
    }

    /// Zero-based index of the page being drawn.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// The content-space region that ends up visible on this page.
    pub fn visible_region(&self) -> ContentRect {
        ContentRect {
            x: 0.0,
            y: self.window.offset,
            width: self.window.width,
            height: self.window.height,
        }
    }

    /// Number of recorded drawing operations.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Clip to `printable` and map content-space `(0, offset)` onto its origin.
    pub(crate) fn begin_slice(&mut self, printable: &PrintableRect, offset: f32) {
        self.window = ContentWindow {
            origin_x: printable.x,
            origin_y: printable.y,
            offset,
            width: printable.width,
            height: printable.height,
        };
        let (x1, y1) = (printable.x, self.page_height - printable.y - printable.height);
        let (x2, y2) = (printable.x + printable.width, self.page_height - printable.y);
        self.ops.push(Op::SaveGraphicsState);
        self.ops.push(Op::DrawPolygon {
            polygon: rect_polygon(x1, y1, x2, y2, PaintMode::Clip),
        });
    }

    pub(crate) fn end_slice(&mut self) {
        self.ops.push(Op::RestoreGraphicsState);
    }

    pub(crate) fn into_page(self) -> PdfPage {
        PdfPage::new(pt_to_mm(self.page_width), pt_to_mm(self.page_height), self.ops)
    }

    /// Content-space point → PDF page point.
    fn to_pdf(&self, x: f32, y: f32) -> (f32, f32) {
        let page_x = self.window.origin_x + x;
        let page_y = self.window.origin_y + (y - self.window.offset);
        (page_x, self.page_height - page_y)
    }

    /// Fill a content-space rectangle.
    pub fn fill_rect(&mut self, rect: ContentRect, color: Rgba) {
        let (x1, y2) = self.to_pdf(rect.x, rect.y);
        let (x2, y1) = self.to_pdf(rect.x + rect.width, rect.bottom());
        self.ops.push(Op::SetFillColor { col: rgb(color) });
        self.ops.push(Op::DrawPolygon {
            polygon: rect_polygon(x1, y1, x2, y2, PaintMode::Fill),
        });
    }

    /// Outline a content-space rectangle.
    pub fn stroke_rect(&mut self, rect: ContentRect, width: f32, color: Rgba) {
        let (x1, y2) = self.to_pdf(rect.x, rect.y);
        let (x2, y1) = self.to_pdf(rect.x + rect.width, rect.bottom());
        self.ops.push(Op::SetOutlineColor { col: rgb(color) });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(width) });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: vec![
                    line_point(x1, y2),
                    line_point(x2, y2),
                    line_point(x2, y1),
                    line_point(x1, y1),
                ],
                is_closed: true,
            },
        });
    }

    /// Write one line of text whose top edge sits at content-space `y`.
    ///
    /// `max_width` bounds the underline, when one is requested.
    pub fn text_line(&mut self, x: f32, y: f32, text: &str, style: &TextStyle, max_width: f32) {
        if text.is_empty() {
            return;
        }
        let font = match (style.bold, style.italic) {
            (true, true) => BuiltinFont::HelveticaBoldOblique,
            (true, false) => BuiltinFont::HelveticaBold,
            (false, true) => BuiltinFont::HelveticaOblique,
            (false, false) => BuiltinFont::Helvetica,
        };
        // Baseline ≈ top of line + ascender (approx 0.75 × font_size)
        let (text_x, top) = self.to_pdf(x, y);
        let text_y = top - style.font_size * 0.75;

        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(text_x),
                y: Pt(text_y),
            },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(style.font_size),
            font,
        });
        self.ops.push(Op::SetFillColor {
            col: rgb(style.color),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_builtin_charset(text))],
            font,
        });
        self.ops.push(Op::EndTextSection);

        if style.underline {
            let underline_y = text_y - style.font_size * 0.1;
            self.ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
            self.ops.push(Op::SetOutlineColor {
                col: rgb(style.color),
            });
            self.ops.push(Op::DrawLine {
                line: Line {
                    points: vec![
                        line_point(text_x, underline_y),
                        line_point(text_x + max_width, underline_y),
                    ],
                    is_closed: false,
                },
            });
        }
    }

    /// Place a `data:` URI image into a content-space rectangle.
    ///
    /// Undecodable images are skipped with a `log::warn`; returns whether the
    /// image was drawn.
    pub fn draw_image(&mut self, src: &str, rect: ContentRect) -> bool {
        let bytes = match parse_data_uri(src) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Skipping image: {e}");
                return false;
            }
        };
        let Some(res) = self.images.resolve(self.doc, &bytes) else {
            return false;
        };
        let (xobj_id, px_width, px_height) = (res.xobj_id.clone(), res.px_width, res.px_height);

        // translate_y = bottom edge of image in PDF coordinates.
        let (left, bottom) = self.to_pdf(rect.x, rect.bottom());

        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
        let scale = |want: f32, px: u32| if px > 0 { want / px as f32 } else { 1.0 };

        self.ops.push(Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(left)),
                translate_y: Some(Pt(bottom)),
                dpi: Some(72.0),
                scale_x: Some(scale(rect.width, px_width)),
                scale_y: Some(scale(rect.height, px_height)),
                rotate: None,
            },
        });
        true
    }
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 0.352778)
}

fn rgb(c: Rgba) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn line_point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn rect_polygon(x1: f32, y1: f32, x2: f32, y2: f32, mode: PaintMode) -> Polygon {
    Polygon {
        rings: vec![PolygonRing {
            points: vec![
                line_point(x1, y1),
                line_point(x2, y1),
                line_point(x2, y2),
                line_point(x1, y2),
            ],
        }],
        mode,
        winding_order: WindingOrder::NonZero,
    }
}

/// Characters of the WinAnsi code page above Latin-1's C1 range (0x80-0x9F).
const WIN_ANSI_EXTRAS: &[char] = &[
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}',
    '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{017E}', '\u{0178}',
];

/// Builtin PDF fonts are WinAnsi-encoded by printpdf; keep what that code
/// page can represent and replace everything else with `?`.
fn to_builtin_charset(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{00A0}' => ' ',
            ' '..='~' | '\u{00A1}'..='\u{00FF}' => c,
            c if WIN_ANSI_EXTRAS.contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let Some(rest) = src.strip_prefix("data:") else {
        let preview: String = src.chars().take(80).collect();
        return Err(format!(
            "image src must be a base64 data URI (e.g. `data:image/png;base64,...`). Got: {preview:?}"
        ));
    };
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(y: f32, height: f32) -> ContentRect {
        ContentRect {
            x: 0.0,
            y,
            width: 10.0,
            height,
        }
    }

    #[test]
    fn maps_content_slice_onto_printable_origin() {
        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let mut canvas = PageCanvas::new(&mut doc, &mut images, 1, 612.0, 792.0);
        let printable = PrintableRect {
            x: 36.0,
            y: 36.0,
            width: 540.0,
            height: 720.0,
        };
        canvas.begin_slice(&printable, 720.0);

        // Top of page 1's slice lands on the printable rect's top edge.
        assert_eq!(canvas.to_pdf(0.0, 720.0), (36.0, 792.0 - 36.0));
        // Bottom of the slice lands on the bottom margin.
        assert_eq!(canvas.to_pdf(540.0, 1440.0), (576.0, 36.0));
        assert_eq!(
            canvas.visible_region(),
            ContentRect {
                x: 0.0,
                y: 720.0,
                width: 540.0,
                height: 720.0
            }
        );
    }

    #[test]
    fn slice_is_wrapped_in_saved_clip() {
        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let mut canvas = PageCanvas::new(&mut doc, &mut images, 0, 612.0, 792.0);
        let printable = PrintableRect {
            x: 36.0,
            y: 36.0,
            width: 540.0,
            height: 720.0,
        };
        canvas.begin_slice(&printable, 0.0);
        canvas.fill_rect(rect(0.0, 10.0), [1.0, 0.0, 0.0, 1.0]);
        canvas.end_slice();

        let ops = canvas.ops;
        assert!(matches!(ops.first(), Some(Op::SaveGraphicsState)));
        assert!(matches!(
            &ops[1],
            Op::DrawPolygon { polygon } if matches!(polygon.mode, PaintMode::Clip)
        ));
        assert!(matches!(ops.last(), Some(Op::RestoreGraphicsState)));
    }

    #[test]
    fn empty_text_records_nothing() {
        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let mut canvas = PageCanvas::new(&mut doc, &mut images, 0, 612.0, 792.0);
        canvas.text_line(0.0, 0.0, "", &TextStyle::default(), 100.0);
        assert_eq!(canvas.op_count(), 0);
    }

    #[test]
    fn non_data_uri_images_are_skipped() {
        let mut doc = PdfDocument::new("test");
        let mut images = ImageRegistry::default();
        let mut canvas = PageCanvas::new(&mut doc, &mut images, 0, 612.0, 792.0);
        assert!(!canvas.draw_image("https://example.com/a.png", rect(0.0, 10.0)));
        assert!(!canvas.draw_image("data:image/png;base64,@@@", rect(0.0, 10.0)));
        assert_eq!(canvas.op_count(), 0);
        assert_eq!(images.len(), 0);
    }

    #[test]
    fn win_ansi_text_is_kept() {
        assert_eq!(to_builtin_charset("Café £5 naïve"), "Café £5 naïve");
        assert_eq!(to_builtin_charset("“Hi” – it’s… €9™"), "“Hi” – it’s… €9™");
        assert_eq!(to_builtin_charset("a\u{00A0}b"), "a b");
    }

    #[test]
    fn characters_outside_win_ansi_are_replaced() {
        assert_eq!(to_builtin_charset("日本"), "??");
        assert_eq!(to_builtin_charset("Ωx\u{0007}"), "?x?");
    }

    #[test]
    fn vertical_overlap() {
        assert!(rect(0.0, 10.0).overlaps_vertically(&rect(5.0, 10.0)));
        assert!(!rect(0.0, 10.0).overlaps_vertically(&rect(10.0, 10.0)));
    }
}
