//! Embedded runtime interface
//!
//! The bootstrap never talks to an interpreter directly. Everything it needs
//! from the host goes through [`Runtime`], so the same logic runs against
//! CPython in the shipped binary and against an instrumented fake in tests.
//!
//! Ownership follows the usual scoped-handle rules: a [`Runtime::Object`] is
//! an owned reference that is released when dropped, and a
//! [`Runtime::Config`] releases its native buffers when dropped.

use std::ffi::OsString;
use std::path::Path;

use crate::error::RuntimeFault;

#[cfg(test)]
pub mod fake;

pub type RuntimeResult<T> = Result<T, RuntimeFault>;

/// Pre-initialization configuration object owned by the runtime.
///
/// Setters mirror the fields the bootstrap controls. String-valued setters
/// can fail when the value cannot be converted to the runtime's native
/// encoding.
pub trait NativeConfig {
    /// Use a preset (empty) module search path instead of computing one
    fn set_search_paths_preset(&mut self, preset: bool);

    fn set_write_bytecode(&mut self, write: bool);

    fn set_stdlib_dir(&mut self, dir: &Path) -> RuntimeResult<()>;

    fn set_program_name(&mut self, program: &Path) -> RuntimeResult<()>;

    /// Whether the runtime should parse its own options out of argv
    fn set_parse_argv(&mut self, parse: bool);

    fn set_argv(&mut self, argv: &[OsString]) -> RuntimeResult<()>;
}

/// Host capabilities used by the bootstrap.
pub trait Runtime {
    /// Owned reference to a runtime value. Dropping it releases the reference.
    type Object;

    /// Native configuration object. Dropping it releases the configuration.
    type Config: NativeConfig;

    /// Acquire a fresh configuration object with the runtime's defaults.
    fn new_config(&mut self) -> Self::Config;

    /// Initialize the runtime. Must be called at most once per process.
    fn initialize(&mut self, config: &Self::Config) -> RuntimeResult<()>;

    /// Run the runtime's own main loop and return its exit status.
    fn run_main(&mut self) -> i32;

    fn import(&mut self, name: &str) -> RuntimeResult<Self::Object>;

    fn get_attr(&mut self, object: &Self::Object, name: &str) -> RuntimeResult<Self::Object>;

    /// Call `callable` with positional `args`. A request to end the process
    /// comes back as a fault with [`RuntimeFault::exit_status`] set.
    fn call(&mut self, callable: &Self::Object, args: &[&Self::Object])
        -> RuntimeResult<Self::Object>;

    /// Publish a process-wide attribute (`sys.<name>` in CPython).
    fn set_process_attribute(&mut self, name: &str, value: &Self::Object) -> RuntimeResult<()>;

    /// Parse an integer from text, auto-detecting the base from its prefix.
    fn new_int(&mut self, text: &str) -> RuntimeResult<Self::Object>;

    fn new_str(&mut self, text: &str) -> RuntimeResult<Self::Object>;

    /// Build a string from a filesystem path, decoded the same way the
    /// runtime decodes paths handed to its configuration.
    fn new_path(&mut self, path: &Path) -> RuntimeResult<Self::Object>;

    fn new_bool(&mut self, value: bool) -> RuntimeResult<Self::Object>;

    /// Map a value returned from an entry point to a process exit status.
    fn exit_status(&mut self, value: &Self::Object) -> i32;

    /// Print the runtime's pending error detail, if it has one.
    fn print_error(&mut self);

    /// Shut the runtime down and flush its output streams. Does nothing if
    /// the runtime is not running.
    fn finalize(&mut self) -> RuntimeResult<()>;
}
