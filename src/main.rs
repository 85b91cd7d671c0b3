//! viewprint – command-line content snapshot → PDF converter.
//!
//! Usage:
//!   viewprint <snapshot.json> [output.pdf] [--page letter|a4|WxH] [--margin PT]
//!             [--landscape] [--title "My Page"]
//!
//! If `output.pdf` is omitted the PDF is written next to the input file with
//! the same stem (e.g. `page.json` → `page.pdf`).

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::{env, fs, process};

use viewprint::geometry::{PageMargins, PageOrientation, PageSize};
use viewprint::pipeline::{render, PrintOptions};
use viewprint::snapshot::{ContentSnapshot, SnapshotSource};
use viewprint::source::SourceHandle;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut options = PrintOptions::default();
    let mut title: Option<String> = None;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--landscape" | "-l" => options.orientation = PageOrientation::Landscape,
            "--title" | "-t" => title = iter.next().cloned(),
            "--page" | "-p" => match iter.next().map(|v| parse_page_size(v.as_str())) {
                Some(Some(size)) => options.page_size = size,
                _ => fail(&args[0], "--page expects letter, a4 or <width>x<height> in points"),
            },
            "--margin" | "-m" => match iter.next().and_then(|v| v.parse::<f32>().ok()) {
                Some(m) => options.margins = PageMargins::uniform(m),
                None => fail(&args[0], "--margin expects a number of points"),
            },
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => fail(&args[0], &format!("Unknown flag: {other}")),
            path => {
                match positional {
                    0 => input_path = Some(PathBuf::from(path)),
                    1 => output_path = Some(PathBuf::from(path)),
                    _ => fail(&args[0], &format!("Unexpected argument: {path}")),
                }
                positional += 1;
            }
        }
    }

    let Some(input) = input_path else {
        fail(&args[0], "Error: no input file specified.");
    };

    // Default output: same directory + same stem as input, but with .pdf
    let output = output_path.unwrap_or_else(|| input.with_extension("pdf"));

    let json = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", input.display());
            process::exit(1);
        }
    };
    let snapshot = match ContentSnapshot::from_json(&json) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error parsing '{}': {e}", input.display());
            process::exit(1);
        }
    };

    // Default title: stem of the input filename.
    options.title = title.unwrap_or_else(|| {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("viewprint output")
            .to_string()
    });

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            process::exit(1);
        }
    };

    let source = Rc::new(RefCell::new(SnapshotSource::new(snapshot)));
    let mut exit_code = 1;
    runtime.block_on(render(&options, SourceHandle::new(&source), |outcome| {
        match outcome {
            Ok(pdf) => {
                if let Err(e) = write_output(&output, &pdf.bytes) {
                    eprintln!("Error writing '{}': {e}", output.display());
                    return;
                }
                eprintln!(
                    "Wrote '{}' ({} bytes, {} page{})",
                    output.display(),
                    pdf.bytes.len(),
                    pdf.page_count,
                    if pdf.page_count == 1 { "" } else { "s" }
                );
                exit_code = 0;
            }
            Err(failure) => eprintln!("Error generating PDF: {failure}"),
        }
    }));
    process::exit(exit_code);
}

/// Create the output directory if necessary, then write the bytes.
fn write_output(output: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, bytes)
}

fn parse_page_size(value: &str) -> Option<PageSize> {
    match value.to_ascii_lowercase().as_str() {
        "letter" => Some(PageSize::letter()),
        "a4" => Some(PageSize::a4()),
        other => {
            let (w, h) = other.split_once('x')?;
            Some(PageSize::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
        }
    }
}

fn fail(prog: &str, msg: &str) -> ! {
    eprintln!("{msg}");
    print_usage(prog);
    process::exit(1);
}

fn print_usage(prog: &str) {
    eprintln!("viewprint – content snapshot to PDF converter");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <snapshot.json> [output.pdf] [--page letter|a4|WxH] [--margin PT] [--landscape] [--title \"My Page\"]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <snapshot.json> Captured content snapshot (images must be base64 data URIs; others are skipped)");
    eprintln!("  [output.pdf]    Output path  (default: same stem as input with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --page, -p      Page size in points (default: letter, 612×792)");
    eprintln!("  --margin, -m    Margin on every edge in points (default: 36)");
    eprintln!("  --title, -t     Document title in PDF metadata (default: input filename stem)");
    eprintln!("  --landscape     Use landscape page orientation");
    eprintln!("  --help          Print this message");
}
