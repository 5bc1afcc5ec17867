use std::env;
use std::path::PathBuf;

fn main() {
    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR not set, skipping header generation");
        return;
    };
    let output_file = PathBuf::from(&crate_dir).join("../../ForeFireFFI.h");

    // Generate C bindings using cbindgen
    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FOREFIRE_FFI_H")
        .with_documentation(true)
        .with_pragma_once(false)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(output_file);
        }
        Err(err) => println!("cargo:warning=cbindgen failed: {err}"),
    }

    println!("cargo:rerun-if-changed=src");
}
