//! Build script for the frostpy launcher
//!
//! Frozen builds link the frozen module table produced by the packager.

fn main() {
    println!("cargo:rerun-if-env-changed=FROSTPY_FROZEN_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_FROZEN").is_none() {
        return;
    }

    match std::env::var("FROSTPY_FROZEN_LIB_DIR") {
        Ok(dir) => {
            println!("cargo:rustc-link-search=native={}", dir);
            println!("cargo:rustc-link-lib=static=frostpy_frozen");
        }
        Err(_) => {
            println!(
                "cargo:warning=FROSTPY_FROZEN_LIB_DIR is not set; the frozen module table must be provided some other way"
            );
        }
    }
}
