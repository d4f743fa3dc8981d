//! Multiprocessing worker dispatch
//!
//! A frozen application cannot be re-launched as `python -c ...` by the
//! multiprocessing spawn logic, so the bootstrap hooks make it spawn the
//! application binary itself with the fork flag. This module picks that up
//! and hands control to `multiprocessing.spawn.spawn_main`.

use log::debug;

use crate::args::WorkerArgs;
use crate::error::{BootError, RuntimeFault};
use crate::frozen;
use crate::options::LaunchOptions;
use crate::runtime::Runtime;

/// Run the worker entry point and return the exit status it produced.
///
/// The call blocks for the whole life of the worker's task loop.
pub fn dispatch<R: Runtime>(
    runtime: &mut R,
    args: &WorkerArgs,
    options: &LaunchOptions,
) -> Result<i32, BootError> {
    frozen::bootstrap(runtime, options)?;

    let params = args.validate()?;
    debug!("Worker parameters: {:?}", params);

    let entry = format!("{}.{}", options.spawn_module, options.spawn_function);
    let spawn = runtime
        .import(&options.spawn_module)
        .map_err(|e| BootError::import(&options.spawn_module, e))?;
    let spawn_main = runtime
        .get_attr(&spawn, &options.spawn_function)
        .map_err(|e| BootError::invocation(format!("Accessing function {}", entry), e))?;

    let pipe_handle = runtime.new_int(&params.pipe_handle).map_err(|e| {
        BootError::argument(format!(
            "Failed to parse pipe_handle={} while starting multiprocess: {}",
            params.pipe_handle, e
        ))
    })?;
    let parent_pid = match &params.parent_pid {
        Some(text) => Some(runtime.new_int(text).map_err(|e| {
            BootError::argument(format!(
                "Failed to parse parent_pid={} while starting multiprocess: {}",
                text, e
            ))
        })?),
        None => None,
    };

    let mut call_args = vec![&pipe_handle];
    call_args.extend(parent_pid.as_ref());

    debug!("Calling {} with {} argument(s)", entry, call_args.len());
    // spawn_main normally ends with sys.exit(exitcode)
    let status = match runtime.call(&spawn_main, &call_args) {
        Ok(result) => runtime.exit_status(&result),
        Err(RuntimeFault {
            exit_status: Some(status),
            ..
        }) => status,
        Err(e) => return Err(BootError::invocation(entry, e)),
    };
    debug!("Worker finished with status {}", status);
    Ok(status)
}
