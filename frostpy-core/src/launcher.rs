//! Process entry
//!
//! Ties the bootstrap together: classify the process, build its runtime
//! configuration, initialize the runtime and hand control to the role's
//! entry point.

use log::{info, warn};

use crate::args::{classify, ProcessRole};
use crate::config::RuntimeConfig;
use crate::error::BootError;
use crate::frozen;
use crate::lifecycle::{self, ProcessAttributes};
use crate::options::{BuildMode, LaunchEnv, LaunchOptions};
use crate::runtime::Runtime;
use crate::worker;

/// Exit status for every bootstrap failure
pub const FAILURE_STATUS: i32 = 1;

/// Exit status when the runtime could not flush its streams on shutdown
pub const FLUSH_FAILURE_STATUS: i32 = 120;

/// Run the bootstrap and return the process exit status.
pub fn run<R: Runtime>(
    runtime: &mut R,
    env: &LaunchEnv,
    mode: BuildMode,
    options: &LaunchOptions,
) -> Result<i32, BootError> {
    let role = classify(&env.argv, mode, options)?;
    info!("Starting in {} role", role.name());

    let config = RuntimeConfig::for_role(&role, env)?;
    let attributes = ProcessAttributes::for_role(&role, &config);

    lifecycle::initialize(runtime, config)?;
    lifecycle::publish_attributes(runtime, &attributes, options)?;

    match role {
        ProcessRole::Normal => Ok(runtime.run_main()),
        ProcessRole::FrozenEntry => {
            frozen::bootstrap(runtime, options)?;
            frozen::run_entry_module(runtime, options)
        }
        ProcessRole::MultiprocessingWorker(args) => worker::dispatch(runtime, &args, options),
    }
}

/// Like [`run`], but reports a failure on stderr (our one-line diagnostic,
/// then the runtime's own error detail) and maps it to [`FAILURE_STATUS`].
/// The runtime is shut down before the status is returned.
pub fn launch<R: Runtime>(
    runtime: &mut R,
    env: &LaunchEnv,
    mode: BuildMode,
    options: &LaunchOptions,
) -> i32 {
    let status = match run(runtime, env, mode, options) {
        Ok(status) => status,
        Err(err) => {
            eprintln!("{}", err);
            runtime.print_error();
            FAILURE_STATUS
        }
    };

    match runtime.finalize() {
        Ok(()) => status,
        Err(e) => {
            warn!("Runtime shutdown failed: {}", e);
            FLUSH_FAILURE_STATUS
        }
    }
}
