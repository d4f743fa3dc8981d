//! frostpy Core Library
//!
//! Process bootstrap for an embedded Python runtime:
//! - Role detection (interpreter, frozen application, multiprocessing worker)
//! - Runtime configuration and one-shot initialization
//! - Frozen entry module and worker spawn dispatch
//! - CPython backend (pyo3, optional)

pub mod args;
pub mod config;
pub mod error;
pub mod frozen;
pub mod launcher;
pub mod lifecycle;
pub mod options;
pub mod runtime;
pub mod worker;

#[cfg(feature = "python")]
pub mod python;

pub use args::{classify, ProcessRole, WorkerArgs, WorkerParams};
pub use config::RuntimeConfig;
pub use error::{BootError, RuntimeFault};
pub use launcher::{launch, run, FAILURE_STATUS, FLUSH_FAILURE_STATUS};
pub use lifecycle::ProcessAttributes;
pub use options::{BuildMode, LaunchEnv, LaunchOptions};
pub use runtime::{NativeConfig, Runtime};
