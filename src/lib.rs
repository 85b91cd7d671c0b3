//! # viewprint – rendered web content → paginated PDF
//!
//! This crate turns the rendered content of a web view into a multi-page PDF
//! and hands the bytes back through a completion callback that fires exactly
//! once. The pipeline stages are:
//!
//! 1. **Geometry** – page size and margins → printable rectangle ([`geometry`])
//! 2. **Readiness** – wait for the content's page count to settle ([`readiness`])
//! 3. **Render** – clip and translate one content slice per page ([`page_renderer`])
//! 4. **Assemble** – collect pages into a printpdf document ([`assembler`])
//! 5. **Dispatch** – deliver the outcome once ([`dispatch`])
//!
//! Content is supplied through the [`source::ContentSource`] capability;
//! [`snapshot`] provides one backed by a serialisable box model. A
//! C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod assembler;
pub mod canvas;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod job;
pub mod page_renderer;
pub mod pipeline;
pub mod readiness;
pub mod snapshot;
pub mod source;

// Re-exports for convenience
pub use dispatch::{RenderFailure, RenderOutcome, RenderedPdf};
pub use error::{DrawError, GeometryError, PrintError, ReadinessError};
pub use geometry::{PageMargins, PageOrientation, PageSize, PrintableRect};
pub use pipeline::{render, render_to_outcome, PrintOptions};
pub use source::{ContentSource, SourceHandle};
