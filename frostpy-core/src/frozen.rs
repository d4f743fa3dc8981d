//! Frozen application entry
//!
//! A frozen application first imports its bootstrap module (which installs
//! the frozen importer and multiprocessing hooks) and then runs its entry
//! module under the `__main__` name.

use log::debug;

use crate::error::{BootError, RuntimeFault};
use crate::options::LaunchOptions;
use crate::runtime::Runtime;

/// Import the bootstrap module for its side effects and let go of it.
pub fn bootstrap<R: Runtime>(runtime: &mut R, options: &LaunchOptions) -> Result<(), BootError> {
    let module = &options.bootstrap_module;
    debug!("Importing {}", module);
    runtime
        .import(module)
        .map_err(|e| BootError::import(module, e))?;
    Ok(())
}

/// Run the entry module as `__main__`, without touching `sys.argv[0]`.
pub fn run_entry_module<R: Runtime>(
    runtime: &mut R,
    options: &LaunchOptions,
) -> Result<i32, BootError> {
    let facility = format!("{}.{}", options.run_module, options.run_module_function);

    let runpy = runtime
        .import(&options.run_module)
        .map_err(|e| BootError::import(&options.run_module, e))?;
    let run_module = runtime
        .get_attr(&runpy, &options.run_module_function)
        .map_err(|e| BootError::invocation(format!("Accessing {}", facility), e))?;
    let module_name = runtime
        .new_str(&options.entry_module)
        .map_err(|e| BootError::invocation("Converting module name to unicode", e))?;
    audit(runtime, &options.run_module_audit_event, &module_name, options)?;
    let set_argv0 = runtime
        .new_bool(false)
        .map_err(|e| BootError::invocation(format!("Creating arguments for {}", facility), e))?;

    debug!("Running {} as __main__", options.entry_module);
    match runtime.call(&run_module, &[&module_name, &set_argv0]) {
        Ok(_) => Ok(0),
        Err(RuntimeFault {
            exit_status: Some(status),
            ..
        }) => {
            debug!("{} requested exit with status {}", options.entry_module, status);
            Ok(status)
        }
        Err(e) => Err(BootError::invocation(
            format!("Running {}", options.entry_module),
            e,
        )),
    }
}

/// Raise an audit event with a single argument, so installed audit hooks see
/// (and may veto) what is about to run.
fn audit<R: Runtime>(
    runtime: &mut R,
    event: &str,
    arg: &R::Object,
    options: &LaunchOptions,
) -> Result<(), BootError> {
    let operation = format!("Raising audit event {}", event);
    let sys = runtime
        .import(&options.audit_module)
        .map_err(|e| BootError::import(&options.audit_module, e))?;
    let hook = runtime
        .get_attr(&sys, &options.audit_function)
        .map_err(|e| BootError::invocation(&operation, e))?;
    let name = runtime
        .new_str(event)
        .map_err(|e| BootError::invocation(&operation, e))?;
    runtime
        .call(&hook, &[&name, arg])
        .map_err(|e| BootError::invocation(&operation, e))?;
    Ok(())
}
