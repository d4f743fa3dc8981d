//! Runtime configuration
//!
//! Builds the pre-initialization settings for each process role and applies
//! them, in a fixed order, to the runtime's native configuration object.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::args::ProcessRole;
use crate::error::BootError;
use crate::options::LaunchEnv;
use crate::runtime::NativeConfig;

/// Interpreter location inside a virtual environment
#[cfg(windows)]
const VENV_INTERPRETER: &[&str] = &["Scripts", "python.exe"];
#[cfg(not(windows))]
const VENV_INTERPRETER: &[&str] = &["bin", "python"];

/// Settings handed to the runtime before it starts.
///
/// `None` and the defaults from [`RuntimeConfig::interpreter`] leave the
/// runtime's own choice untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub search_paths_preset: bool,
    pub write_bytecode: bool,
    pub stdlib_dir_override: Option<PathBuf>,
    pub program_name_override: Option<PathBuf>,
    pub argv: Vec<OsString>,
    pub parse_argv: bool,
}

impl RuntimeConfig {
    /// Defaults of a regular interpreter run
    pub fn interpreter(argv: Vec<OsString>) -> Self {
        Self {
            search_paths_preset: false,
            write_bytecode: true,
            stdlib_dir_override: None,
            program_name_override: None,
            argv,
            parse_argv: true,
        }
    }

    /// Build the configuration for `role`.
    pub fn for_role(role: &ProcessRole, env: &LaunchEnv) -> Result<Self, BootError> {
        let mut config = Self::interpreter(env.argv.clone());

        match role {
            ProcessRole::Normal => {
                config.program_name_override = env.virtual_env.as_deref().map(venv_interpreter);
            }
            ProcessRole::FrozenEntry | ProcessRole::MultiprocessingWorker(_) => {
                // Everything the application needs is frozen or sits beside
                // the executable, which may live on a read-only volume.
                config.search_paths_preset = true;
                config.write_bytecode = false;
                config.stdlib_dir_override = Some(executable_dir(env)?);
                config.parse_argv = false;
            }
        }

        debug!("Runtime config for {} role: {:?}", role.name(), config);
        Ok(config)
    }

    /// Copy the settings onto a native config object.
    ///
    /// Order matters to the runtime: search-path mode, bytecode policy,
    /// stdlib location, program name, then argv.
    pub fn apply<C: NativeConfig>(&self, native: &mut C) -> Result<(), BootError> {
        if self.search_paths_preset {
            native.set_search_paths_preset(true);
        }
        if !self.write_bytecode {
            native.set_write_bytecode(false);
        }
        if let Some(dir) = &self.stdlib_dir_override {
            native
                .set_stdlib_dir(dir)
                .map_err(|e| BootError::config_build("Failed to set sys._stdlib_dir", e.message))?;
        }
        if let Some(program) = &self.program_name_override {
            native.set_program_name(program).map_err(|e| {
                BootError::config_build("Failed to set venv python executable", e.message)
            })?;
        }
        if !self.parse_argv {
            native.set_parse_argv(false);
        }
        native
            .set_argv(&self.argv)
            .map_err(|e| BootError::config_build("Failed to set sys.argv", e.message))?;
        Ok(())
    }
}

/// Interpreter executable of the virtual environment rooted at `root`
pub fn venv_interpreter(root: &std::ffi::OsStr) -> PathBuf {
    let mut path = PathBuf::from(root);
    path.extend(VENV_INTERPRETER);
    path
}

/// Absolute directory holding the running executable, taken from `argv[0]`.
fn executable_dir(env: &LaunchEnv) -> Result<PathBuf, BootError> {
    let program = env.argv.first().ok_or_else(|| {
        BootError::config_build("Failed to locate the executable", "argv is empty")
    })?;

    let absolute = absolute_path(&env.current_dir, Path::new(program));
    absolute.parent().map(Path::to_path_buf).ok_or_else(|| {
        BootError::config_build(
            "Failed to locate the executable",
            format!("{} has no parent directory", absolute.display()),
        )
    })
}

/// Join `path` onto `base` unless it is already absolute, dropping `.`
/// components. Symlinks and `..` are left alone.
fn absolute_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
