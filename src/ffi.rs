//! C-compatible FFI API for host applications.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Completion
//! `vp_render_snapshot` runs one print job to completion on a private
//! current-thread runtime and invokes the supplied callback exactly once,
//! before returning, with a [`VpRenderResult`]. The result's `status` is `0`
//! on success or one of the `VP_STATUS_*` codes; a failed job never carries
//! a buffer.
//!
//! ## Memory management
//! - A successful result's `pdf_buf` is allocated on the Rust heap and
//!   owned by the host from then on; free it with `vp_free_buffer`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Argument errors
//! Invalid arguments (null pointers, malformed JSON) are rejected with a
//! non-zero return value before a job exists; the callback is not invoked.
//! Details are available from `vp_last_error`.
//!
//! ## Thread safety
//! `vp_last_error` uses a thread-local, so it is safe to call from multiple
//! threads. Each call to `vp_render_snapshot` is independent.

use std::cell::RefCell;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::rc::Rc;
use std::slice;

use crate::error::PrintError;
use crate::geometry::{PageMargins, PageOrientation, PageSize};
use crate::pipeline::{render_to_outcome, PrintOptions};
use crate::snapshot::{ContentSnapshot, SnapshotSource};
use crate::source::SourceHandle;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub const VP_STATUS_OK: c_int = 0;
pub const VP_STATUS_NULL_ARGUMENT: c_int = 1;
pub const VP_STATUS_INVALID_SNAPSHOT: c_int = 2;
pub const VP_STATUS_RUNTIME: c_int = 3;
pub const VP_STATUS_DEGENERATE_PAGE: c_int = 10;
pub const VP_STATUS_MARGINS_EXCEED_PAGE: c_int = 11;
pub const VP_STATUS_LAYOUT_TIMEOUT: c_int = 20;
pub const VP_STATUS_EMPTY_CONTENT: c_int = 21;
pub const VP_STATUS_SOURCE_INVALIDATED: c_int = 22;
pub const VP_STATUS_CONTEXT_UNAVAILABLE: c_int = 30;
pub const VP_STATUS_CANCELLED: c_int = 40;

fn status_of(error: &PrintError) -> c_int {
    error.code() as c_int
}

// ---------------------------------------------------------------------------
// C-compatible configuration and result types
// ---------------------------------------------------------------------------

/// Page orientation for use in [`VpPrintConfig`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpPageOrientation {
    /// Portrait mode: height ≥ width (default).
    Portrait = 0,
    /// Landscape mode: width > height.
    Landscape = 1,
}

/// Print configuration.
///
/// `page_width`/`page_height` of `0` fall back to US Letter, `layout_timeout_ms`
/// of `0` to the default budget. Margins are used as given.
#[repr(C)]
pub struct VpPrintConfig {
    /// Null-terminated UTF-8 document title. `NULL` → "viewprint output".
    pub title: *const c_char,
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_left: f32,
    pub margin_bottom: f32,
    pub margin_right: f32,
    pub orientation: VpPageOrientation,
    pub layout_timeout_ms: u32,
}

/// The tagged result handed to a [`VpCompletion`].
#[repr(C)]
pub struct VpRenderResult {
    /// `VP_STATUS_OK` or a failure code.
    pub status: c_int,
    /// PDF bytes on success, null otherwise.
    pub pdf_buf: *mut u8,
    pub pdf_len: u32,
    /// Pages in the document, or the last known count on failure.
    pub page_count: u32,
}

/// Completion callback; called exactly once per accepted job.
pub type VpCompletion = extern "C" fn(user_data: *mut c_void, result: VpRenderResult);

/// Convert a `VpPrintConfig` (FFI) to `PrintOptions` (Rust).
///
/// # Safety
/// `cfg.title`, if non-null, must point to a valid null-terminated string.
unsafe fn print_options_from_c(cfg: &VpPrintConfig) -> PrintOptions {
    let mut options = PrintOptions::default();

    if !cfg.title.is_null() {
        if let Ok(title) = CStr::from_ptr(cfg.title).to_str() {
            options.title = title.to_string();
        }
    }
    if cfg.page_width != 0.0 || cfg.page_height != 0.0 {
        options.page_size = PageSize::new(cfg.page_width, cfg.page_height);
    }
    options.margins = PageMargins::new(
        cfg.margin_top,
        cfg.margin_left,
        cfg.margin_bottom,
        cfg.margin_right,
    );
    options.orientation = match cfg.orientation {
        VpPageOrientation::Portrait => PageOrientation::Portrait,
        VpPageOrientation::Landscape => PageOrientation::Landscape,
    };
    if cfg.layout_timeout_ms != 0 {
        options.readiness.timeout_ms = u64::from(cfg.layout_timeout_ms);
    }
    options
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Print a JSON content snapshot to PDF.
///
/// # Parameters
/// - `config`: print configuration, or `NULL` for the defaults
/// - `json_ptr`, `json_len`: UTF-8 JSON of a content snapshot
/// - `completion`: invoked exactly once with the job's result
/// - `user_data`: passed through to `completion` untouched
///
/// # Returns
/// `0` when the job ran (the outcome went to `completion`), non-zero when the
/// arguments were rejected and `completion` was not called.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `config`, if non-null, must point to a valid `VpPrintConfig`.
#[no_mangle]
pub unsafe extern "C" fn vp_render_snapshot(
    config: *const VpPrintConfig,
    json_ptr: *const u8,
    json_len: u32,
    completion: Option<VpCompletion>,
    user_data: *mut c_void,
) -> c_int {
    let Some(completion) = completion else {
        set_last_error("Null completion callback");
        return VP_STATUS_NULL_ARGUMENT;
    };
    if json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return VP_STATUS_NULL_ARGUMENT;
    }

    let json_bytes = slice::from_raw_parts(json_ptr, json_len as usize);
    let json = match std::str::from_utf8(json_bytes) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8: {e}"));
            return VP_STATUS_INVALID_SNAPSHOT;
        }
    };
    let snapshot = match ContentSnapshot::from_json(json) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid content snapshot: {e}"));
            return VP_STATUS_INVALID_SNAPSHOT;
        }
    };
    let options = if config.is_null() {
        PrintOptions::default()
    } else {
        print_options_from_c(&*config)
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            set_last_error(&format!("Failed to start runtime: {e}"));
            return VP_STATUS_RUNTIME;
        }
    };

    let source = Rc::new(RefCell::new(SnapshotSource::new(snapshot)));
    let outcome = runtime.block_on(render_to_outcome(&options, SourceHandle::new(&source)));

    let result = match outcome {
        Ok(pdf) => {
            let len = pdf.bytes.len() as u32;
            let raw = Box::into_raw(pdf.bytes.into_boxed_slice()) as *mut u8;
            VpRenderResult {
                status: VP_STATUS_OK,
                pdf_buf: raw,
                pdf_len: len,
                page_count: pdf.page_count as u32,
            }
        }
        Err(failure) => {
            set_last_error(&failure.to_string());
            VpRenderResult {
                status: status_of(&failure.error),
                pdf_buf: ptr::null_mut(),
                pdf_len: 0,
                page_count: failure.page_count as u32,
            }
        }
    };
    completion(user_data, result);
    VP_STATUS_OK
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer delivered in a [`VpRenderResult`].
///
/// # Safety
/// `buf` must come from a successful result, and `len` must be its `pdf_len`.
#[no_mangle]
pub unsafe extern "C" fn vp_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `vp_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn vp_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn vp_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
