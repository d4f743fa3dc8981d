//! Argument classification
//!
//! Decides the process role from argv before the runtime exists, and parses
//! the `key=value` parameters a multiprocessing worker is started with.

use std::ffi::{OsStr, OsString};

use log::debug;

use crate::error::BootError;
use crate::options::{BuildMode, LaunchOptions};

const PIPE_HANDLE_KEY: &str = "pipe_handle";
const PARENT_PID_KEY: &str = "parent_pid";

/// The part this process plays. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessRole {
    /// Ordinary interpreter run; the runtime drives its own main loop
    Normal,
    /// Frozen application running its embedded entry module
    FrozenEntry,
    /// Worker started by the runtime's multiprocessing spawn logic
    MultiprocessingWorker(WorkerArgs),
}

impl ProcessRole {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessRole::Normal => "normal",
            ProcessRole::FrozenEntry => "frozen",
            ProcessRole::MultiprocessingWorker(_) => "multiprocessing worker",
        }
    }

    /// Whether the runtime is started in self-contained mode
    pub fn is_frozen(&self) -> bool {
        !matches!(self, ProcessRole::Normal)
    }
}

/// Worker parameters as found on the command line. A key that never
/// appeared stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerArgs {
    pub pipe_handle: Option<String>,
    pub parent_pid: Option<String>,
}

/// Worker parameters after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerParams {
    pub pipe_handle: String,
    pub parent_pid: Option<String>,
}

impl WorkerArgs {
    /// Parse `key=value` tokens. Unknown keys are skipped, repeated keys keep
    /// the last value.
    pub fn parse<I, S>(tokens: I) -> Result<Self, BootError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut args = WorkerArgs::default();

        for token in tokens {
            let token = token.as_ref().to_string_lossy();
            if token.is_empty() {
                return Err(BootError::argument(
                    "Empty argument while starting multiprocess",
                ));
            }

            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (&*token, None),
            };

            let slot = match key {
                PIPE_HANDLE_KEY => &mut args.pipe_handle,
                PARENT_PID_KEY => &mut args.parent_pid,
                _ => {
                    debug!("Ignoring worker argument {:?}", token);
                    continue;
                }
            };

            match value {
                Some(value) if !value.is_empty() => *slot = Some(value.to_string()),
                _ => {
                    return Err(BootError::argument(format!(
                        "Malformed argument '{}' while starting multiprocess: expected {}=<int>",
                        token, key
                    )))
                }
            }
        }

        Ok(args)
    }

    /// Require the pipe handle; the parent id stays optional.
    pub fn validate(&self) -> Result<WorkerParams, BootError> {
        let pipe_handle = self.pipe_handle.clone().ok_or_else(|| {
            BootError::argument("Could not parse pipe_handle while starting multiprocess")
        })?;

        Ok(WorkerParams {
            pipe_handle,
            parent_pid: self.parent_pid.clone(),
        })
    }
}

/// Classify the process from its argv.
///
/// Only frozen builds honour the fork flag: a plain interpreter sees the same
/// flag in argv when it is itself used as a spawn target and handles it on its
/// own.
pub fn classify(
    argv: &[OsString],
    mode: BuildMode,
    options: &LaunchOptions,
) -> Result<ProcessRole, BootError> {
    if mode == BuildMode::Interpreter {
        return Ok(ProcessRole::Normal);
    }

    let flag = OsStr::new(&options.fork_flag);
    let marker = argv
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, arg)| arg.as_os_str() == flag)
        .map(|(index, _)| index);

    match marker {
        Some(index) => {
            let args = WorkerArgs::parse(&argv[index + 1..])?;
            Ok(ProcessRole::MultiprocessingWorker(args))
        }
        None => Ok(ProcessRole::FrozenEntry),
    }
}
