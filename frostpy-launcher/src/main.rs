//! frostpy launcher
//!
//! Starts the embedded Python runtime. Depending on how it was built and
//! invoked, the process runs the interpreter's own main loop, a frozen
//! application's entry module, or a multiprocessing worker.

#![cfg_attr(all(windows, not(feature = "console")), windows_subsystem = "windows")]

use std::io;

use anyhow::{Context, Result};
use frostpy_core::python::PythonRuntime;
use frostpy_core::{launch, BuildMode, LaunchEnv, LaunchOptions, FAILURE_STATUS};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "frozen")]
const BUILD_MODE: BuildMode = BuildMode::Frozen;
#[cfg(not(feature = "frozen"))]
const BUILD_MODE: BuildMode = BuildMode::Interpreter;

#[cfg(feature = "frozen")]
extern "C" {
    /// Null-terminated frozen module table, linked in from the packager's
    /// `frostpy_frozen` library.
    static frostpy_frozen_modules: u8;
}

fn main() {
    // Logging goes to stderr and is quiet by default: stdout belongs to the
    // Python program.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("FROSTPY_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let env = match capture_env() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(FAILURE_STATUS);
        }
    };
    debug!("Build mode: {:?}, argv: {:?}", BUILD_MODE, env.argv);

    let mut runtime = PythonRuntime::new();

    install_frozen_table(&mut runtime);

    let status = launch(&mut runtime, &env, BUILD_MODE, &LaunchOptions::default());
    debug!("Exiting with status {}", status);
    std::process::exit(status);
}

#[cfg(feature = "frozen")]
fn install_frozen_table(runtime: &mut PythonRuntime) {
    // SAFETY: the packager's table is a static, null-terminated `_frozen` array.
    unsafe {
        runtime.install_frozen_modules(std::ptr::addr_of!(frostpy_frozen_modules).cast());
    }
}

#[cfg(not(feature = "frozen"))]
fn install_frozen_table(_runtime: &mut PythonRuntime) {}

fn capture_env() -> Result<LaunchEnv> {
    let current_dir = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(LaunchEnv::new(
        std::env::args_os(),
        std::env::var_os("VIRTUAL_ENV"),
        current_dir,
    ))
}
