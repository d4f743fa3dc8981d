//! Runtime lifecycle
//!
//! One-shot initialization of the embedded runtime followed by publication of
//! the process-wide attributes the Python side reads (`sys.frozen` and
//! friends).

use std::path::PathBuf;

use log::debug;

use crate::args::ProcessRole;
use crate::config::RuntimeConfig;
use crate::error::BootError;
use crate::options::LaunchOptions;
use crate::runtime::Runtime;

/// Attributes published once the runtime is up. Nothing writes them later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessAttributes {
    pub frozen: bool,
    pub multiprocessing_fork: bool,
    pub stdlib_dir: Option<PathBuf>,
}

impl ProcessAttributes {
    pub fn for_role(role: &ProcessRole, config: &RuntimeConfig) -> Self {
        Self {
            frozen: role.is_frozen(),
            multiprocessing_fork: matches!(role, ProcessRole::MultiprocessingWorker(_)),
            stdlib_dir: config.stdlib_dir_override.clone(),
        }
    }
}

/// Initialize the runtime from `config`.
///
/// The native config object lives only inside this function and is released
/// on every return path, whether applying the settings or the initialization
/// itself failed.
pub fn initialize<R: Runtime>(runtime: &mut R, config: RuntimeConfig) -> Result<(), BootError> {
    let mut native = runtime.new_config();
    config.apply(&mut native)?;

    debug!("Initializing runtime");
    runtime.initialize(&native).map_err(BootError::init)?;
    drop(native);

    debug!("Runtime initialized");
    Ok(())
}

/// Publish `attributes` in a fixed order: stdlib directory, frozen marker,
/// fork marker. The first failure aborts; earlier attributes stay set.
pub fn publish_attributes<R: Runtime>(
    runtime: &mut R,
    attributes: &ProcessAttributes,
    options: &LaunchOptions,
) -> Result<(), BootError> {
    if let Some(dir) = &attributes.stdlib_dir {
        let name = &options.stdlib_dir_attribute;
        let value = runtime
            .new_path(dir)
            .map_err(|e| BootError::attribute_set(name, e))?;
        runtime
            .set_process_attribute(name, &value)
            .map_err(|e| BootError::attribute_set(name, e))?;
    }

    if attributes.frozen {
        set_flag(runtime, &options.frozen_attribute)?;
    }
    if attributes.multiprocessing_fork {
        set_flag(runtime, &options.fork_attribute)?;
    }

    debug!("Published process attributes: {:?}", attributes);
    Ok(())
}

fn set_flag<R: Runtime>(runtime: &mut R, name: &str) -> Result<(), BootError> {
    let value = runtime
        .new_bool(true)
        .map_err(|e| BootError::attribute_set(name, e))?;
    runtime
        .set_process_attribute(name, &value)
        .map_err(|e| BootError::attribute_set(name, e))
}
