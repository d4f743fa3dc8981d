//! Launch options
//!
//! Names the launcher agrees on with the Python side (bootstrap module, entry
//! module, `sys` attributes) plus the process environment captured in `main`.

use std::ffi::OsString;
use std::path::PathBuf;

/// How the binary was built. Decided at compile time, never from argv.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Plain interpreter launcher; the runtime parses its own command line.
    Interpreter,
    /// Self-contained application with a linked-in frozen module table.
    Frozen,
}

/// Fixed names used while bootstrapping the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Flag that marks a multiprocessing worker invocation
    pub fork_flag: String,
    /// Module imported for its side effects before anything else runs
    pub bootstrap_module: String,
    /// Module executed as `__main__` in a frozen application
    pub entry_module: String,
    /// Module providing the run-module-as-main facility
    pub run_module: String,
    pub run_module_function: String,
    /// Audit event raised with the entry module name before it runs
    pub run_module_audit_event: String,
    pub audit_module: String,
    pub audit_function: String,
    /// Module providing the multiprocessing worker entry point
    pub spawn_module: String,
    pub spawn_function: String,
    pub stdlib_dir_attribute: String,
    pub frozen_attribute: String,
    pub fork_attribute: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            fork_flag: "--multiprocessing-fork".to_string(),
            bootstrap_module: "frostpy_bootstrap".to_string(),
            entry_module: "__frostpy_main__".to_string(),
            run_module: "runpy".to_string(),
            run_module_function: "_run_module_as_main".to_string(),
            run_module_audit_event: "cpython.run_module".to_string(),
            audit_module: "sys".to_string(),
            audit_function: "audit".to_string(),
            spawn_module: "multiprocessing.spawn".to_string(),
            spawn_function: "spawn_main".to_string(),
            stdlib_dir_attribute: "_stdlib_dir".to_string(),
            frozen_attribute: "frozen".to_string(),
            fork_attribute: "frostpy_multiprocessing_fork".to_string(),
        }
    }
}

/// Process environment the bootstrap reads, captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    pub argv: Vec<OsString>,
    /// Value of `VIRTUAL_ENV`, if set
    pub virtual_env: Option<OsString>,
    /// Working directory used to make `argv[0]` absolute
    pub current_dir: PathBuf,
}

impl LaunchEnv {
    pub fn new<I, S>(argv: I, virtual_env: Option<OsString>, current_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            virtual_env,
            current_dir: current_dir.into(),
        }
    }
}
