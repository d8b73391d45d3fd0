//! Regenerates `include/httpreq.h` from the `extern "C"` surface.
//!
//! Header generation never fails the build; problems surface as warnings.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };
    let out_dir = crate_dir.join("include");
    if let Err(err) = std::fs::create_dir_all(&out_dir) {
        println!("cargo:warning=cannot create {}: {err}", out_dir.display());
        return;
    }

    let generated = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("HTTPREQ_H")
        .generate();
    match generated {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("httpreq.h"));
        }
        Err(err) => println!("cargo:warning=header not generated: {err}"),
    }
}
