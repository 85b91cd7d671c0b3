use std::env;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=src/ffi.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");
    println!("cargo:rerun-if-env-changed=VIEWPRINT_SKIP_HEADER");

    if env::var_os("VIEWPRINT_SKIP_HEADER").is_some() {
        return;
    }

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    if let Err(e) = write_header(&crate_dir, &crate_dir.join("include").join("viewprint.h")) {
        // The Rust library builds without the C header.
        println!("cargo:warning=viewprint.h not generated: {e}");
    }
}

fn write_header(crate_dir: &Path, header: &Path) -> Result<(), String> {
    let config_path = crate_dir.join("cbindgen.toml");
    let config = if config_path.exists() {
        cbindgen::Config::from_file(&config_path).map_err(|e| e.to_string())?
    } else {
        cbindgen::Config {
            language: cbindgen::Language::C,
            ..Default::default()
        }
    };

    if let Some(dir) = header.parent() {
        std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    }

    let bindings = cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_config(config)
        .generate()
        .map_err(|e| e.to_string())?;
    bindings.write_to_file(header);
    Ok(())
}
