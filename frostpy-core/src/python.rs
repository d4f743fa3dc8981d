//! CPython backend
//!
//! Implements [`Runtime`] on top of pyo3 and the raw init-config API
//! (`PyConfig`, `Py_InitializeFromConfig`, `Py_RunMain`), which pyo3 itself
//! does not wrap.

use std::ffi::{CStr, OsString};
use std::path::Path;
use std::ptr::addr_of_mut;

use log::debug;
use pyo3::exceptions::PySystemExit;
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::{PyLong, PyTuple};

use crate::error::RuntimeFault;
use crate::runtime::{NativeConfig, Runtime, RuntimeResult};

/// Owned `PyConfig`. Cleared on drop.
pub struct PythonConfig {
    config: Box<ffi::PyConfig>,
}

impl PythonConfig {
    fn new() -> Self {
        // SAFETY: PyConfig is plain data; PyConfig_InitPythonConfig fills in
        // every field before anything reads it.
        let mut config: Box<ffi::PyConfig> = Box::new(unsafe { std::mem::zeroed() });
        unsafe { ffi::PyConfig_InitPythonConfig(&mut *config) };
        Self { config }
    }

    fn as_mut_ptr(&mut self) -> *mut ffi::PyConfig {
        &mut *self.config
    }

    /// Store `value` into the wide-string field selected by `field`.
    fn set_string(
        &mut self,
        value: &Path,
        what: &str,
        field: impl FnOnce(*mut ffi::PyConfig) -> *mut *mut libc::wchar_t,
    ) -> RuntimeResult<()> {
        let config = self.as_mut_ptr();
        let slot = field(config);
        let status = native_string(value.as_os_str(), what, |text| unsafe {
            set_config_string(config, slot, text)
        })?;
        check_status(status, what)
    }
}

impl NativeConfig for PythonConfig {
    fn set_search_paths_preset(&mut self, preset: bool) {
        self.config.module_search_paths_set = preset as _;
    }

    fn set_write_bytecode(&mut self, write: bool) {
        self.config.write_bytecode = write as _;
    }

    #[cfg(Py_3_11)]
    fn set_stdlib_dir(&mut self, dir: &Path) -> RuntimeResult<()> {
        // SAFETY: only the field address is computed, nothing is read.
        self.set_string(dir, "Failed to set sys._stdlib_dir.", |config| unsafe {
            addr_of_mut!((*config).stdlib_dir)
        })
    }

    // Older runtimes have no config field; the launcher also publishes
    // sys._stdlib_dir once the runtime is up.
    #[cfg(not(Py_3_11))]
    fn set_stdlib_dir(&mut self, _dir: &Path) -> RuntimeResult<()> {
        Ok(())
    }

    fn set_program_name(&mut self, program: &Path) -> RuntimeResult<()> {
        self.set_string(program, "Failed to set venv python executable.", |config| unsafe {
            addr_of_mut!((*config).program_name)
        })
    }

    fn set_parse_argv(&mut self, parse: bool) {
        self.config.parse_argv = parse as _;
    }

    fn set_argv(&mut self, argv: &[OsString]) -> RuntimeResult<()> {
        let config = self.as_mut_ptr();
        let status = native_argv(argv, |argc, ptrs| unsafe { set_config_argv(config, argc, ptrs) })?;
        check_status(status, "Failed to set sys.argv.")
    }
}

impl Drop for PythonConfig {
    fn drop(&mut self) {
        unsafe { ffi::PyConfig_Clear(&mut *self.config) };
    }
}

#[cfg(unix)]
mod encoding {
    use std::ffi::{CString, OsStr, OsString};
    use std::os::raw::c_char;
    use std::os::unix::ffi::OsStrExt;

    use super::ffi;
    use crate::error::RuntimeFault;

    pub type NativeChar = c_char;

    fn to_native(value: &OsStr, what: &str) -> Result<CString, RuntimeFault> {
        CString::new(value.as_bytes())
            .map_err(|_| RuntimeFault::new(format!("{} Value contains a NUL byte.", what)))
    }

    pub fn native_string<T>(
        value: &OsStr,
        what: &str,
        f: impl FnOnce(*const NativeChar) -> T,
    ) -> Result<T, RuntimeFault> {
        let text = to_native(value, what)?;
        Ok(f(text.as_ptr()))
    }

    pub fn native_argv<T>(
        argv: &[OsString],
        f: impl FnOnce(ffi::Py_ssize_t, *mut *mut NativeChar) -> T,
    ) -> Result<T, RuntimeFault> {
        let owned = argv
            .iter()
            .map(|arg| to_native(arg, "Failed to set sys.argv."))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ptrs: Vec<*mut NativeChar> = owned.iter().map(|arg| arg.as_ptr() as _).collect();
        Ok(f(ptrs.len() as ffi::Py_ssize_t, ptrs.as_mut_ptr()))
    }

    pub unsafe fn set_config_string(
        config: *mut ffi::PyConfig,
        slot: *mut *mut libc::wchar_t,
        text: *const NativeChar,
    ) -> ffi::PyStatus {
        ffi::PyConfig_SetBytesString(config, slot, text)
    }

    pub unsafe fn set_config_argv(
        config: *mut ffi::PyConfig,
        argc: ffi::Py_ssize_t,
        argv: *mut *mut NativeChar,
    ) -> ffi::PyStatus {
        ffi::PyConfig_SetBytesArgv(config, argc, argv as _)
    }
}

#[cfg(windows)]
mod encoding {
    use std::ffi::{OsStr, OsString};
    use std::os::windows::ffi::OsStrExt;

    use super::ffi;
    use crate::error::RuntimeFault;

    pub type NativeChar = libc::wchar_t;

    fn to_native(value: &OsStr, what: &str) -> Result<Vec<NativeChar>, RuntimeFault> {
        let wide: Vec<NativeChar> = value.encode_wide().map(|unit| unit as NativeChar).collect();
        if wide.contains(&0) {
            return Err(RuntimeFault::new(format!("{} Value contains a NUL character.", what)));
        }
        Ok(wide.into_iter().chain(Some(0)).collect())
    }

    pub fn native_string<T>(
        value: &OsStr,
        what: &str,
        f: impl FnOnce(*const NativeChar) -> T,
    ) -> Result<T, RuntimeFault> {
        let text = to_native(value, what)?;
        Ok(f(text.as_ptr()))
    }

    pub fn native_argv<T>(
        argv: &[OsString],
        f: impl FnOnce(ffi::Py_ssize_t, *mut *mut NativeChar) -> T,
    ) -> Result<T, RuntimeFault> {
        let mut owned = argv
            .iter()
            .map(|arg| to_native(arg, "Failed to set sys.argv."))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ptrs: Vec<*mut NativeChar> = owned.iter_mut().map(|arg| arg.as_mut_ptr()).collect();
        Ok(f(ptrs.len() as ffi::Py_ssize_t, ptrs.as_mut_ptr()))
    }

    pub unsafe fn set_config_string(
        config: *mut ffi::PyConfig,
        slot: *mut *mut libc::wchar_t,
        text: *const NativeChar,
    ) -> ffi::PyStatus {
        ffi::PyConfig_SetString(config, slot, text)
    }

    pub unsafe fn set_config_argv(
        config: *mut ffi::PyConfig,
        argc: ffi::Py_ssize_t,
        argv: *mut *mut NativeChar,
    ) -> ffi::PyStatus {
        ffi::PyConfig_SetArgv(config, argc, argv as _)
    }
}

use encoding::{native_argv, native_string, set_config_argv, set_config_string};

/// Turn an exceptional `PyStatus` into a fault, preferring the runtime's own
/// message over `fallback`.
fn check_status(status: ffi::PyStatus, fallback: &str) -> RuntimeResult<()> {
    unsafe {
        if ffi::PyStatus_Exception(status) == 0 {
            return Ok(());
        }
        if ffi::PyStatus_IsError(status) != 0 && !status.err_msg.is_null() {
            let message = CStr::from_ptr(status.err_msg).to_string_lossy();
            return Err(RuntimeFault::new(message));
        }
    }
    Err(RuntimeFault::new(fallback))
}

/// The embedded CPython interpreter.
pub struct PythonRuntime {
    pending: Option<PyErr>,
}

impl PythonRuntime {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Make a frozen module table visible to the import system. Must be
    /// called before [`Runtime::initialize`].
    ///
    /// # Safety
    ///
    /// `table` must point to a valid, null-terminated `_frozen` array that
    /// lives for the rest of the process.
    pub unsafe fn install_frozen_modules(&mut self, table: *const ffi::_frozen) {
        ffi::PyImport_FrozenModules = table;
    }

    /// Keep the Python exception for [`Runtime::print_error`] and hand back
    /// its text. `SystemExit` becomes an exit request instead.
    fn capture<T>(&mut self, result: PyResult<T>) -> RuntimeResult<T> {
        result.map_err(|err| {
            if let Some(status) = Python::with_gil(|py| system_exit_status(py, &err)) {
                return RuntimeFault::exit(status);
            }
            let fault = RuntimeFault::new(err.to_string());
            self.pending = Some(err);
            fault
        })
    }
}

/// Exit status requested by a `SystemExit`, following the interpreter's own
/// rules: no code is 0, an integer is itself, anything else is printed to
/// stderr and gives 1.
fn system_exit_status(py: Python<'_>, err: &PyErr) -> Option<i32> {
    if !err.is_instance_of::<PySystemExit>(py) {
        return None;
    }
    let code = match err.value_bound(py).getattr("code") {
        Ok(code) => code,
        Err(_) => return Some(1),
    };
    if code.is_none() || code.is_instance_of::<PyLong>() {
        return Some(status_from_value(&code));
    }
    eprintln!("{}", code);
    Some(1)
}

/// `None` is 0, an integer that fits is itself, anything else is 1.
fn status_from_value(value: &Bound<'_, PyAny>) -> i32 {
    if value.is_none() {
        return 0;
    }
    match value.extract::<i32>() {
        Ok(status) => status,
        Err(_) => {
            debug!("Exit value {} is not a 32-bit integer, using status 1", value);
            1
        }
    }
}

impl Default for PythonRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for PythonRuntime {
    type Object = PyObject;
    type Config = PythonConfig;

    fn new_config(&mut self) -> PythonConfig {
        PythonConfig::new()
    }

    fn initialize(&mut self, config: &PythonConfig) -> RuntimeResult<()> {
        if unsafe { ffi::Py_IsInitialized() } != 0 {
            return Err(RuntimeFault::new("Python is already initialized"));
        }
        let status = unsafe { ffi::Py_InitializeFromConfig(&*config.config) };
        check_status(status, "Failed to initialize CPython from config.")
    }

    fn run_main(&mut self) -> i32 {
        unsafe { ffi::Py_RunMain() }
    }

    fn import(&mut self, name: &str) -> RuntimeResult<PyObject> {
        let result = Python::with_gil(|py| {
            PyModule::import_bound(py, name).map(|module| module.into_any().unbind())
        });
        self.capture(result)
    }

    fn get_attr(&mut self, object: &PyObject, name: &str) -> RuntimeResult<PyObject> {
        let result =
            Python::with_gil(|py| object.bind(py).getattr(name).map(|attr| attr.unbind()));
        self.capture(result)
    }

    fn call(&mut self, callable: &PyObject, args: &[&PyObject]) -> RuntimeResult<PyObject> {
        let result = Python::with_gil(|py| {
            let args = PyTuple::new_bound(py, args.iter().map(|arg| arg.clone_ref(py)));
            callable.bind(py).call1(args).map(|value| value.unbind())
        });
        self.capture(result)
    }

    fn set_process_attribute(&mut self, name: &str, value: &PyObject) -> RuntimeResult<()> {
        let result = Python::with_gil(|py| {
            PyModule::import_bound(py, "sys")?.setattr(name, value.bind(py))
        });
        self.capture(result)
    }

    fn new_int(&mut self, text: &str) -> RuntimeResult<PyObject> {
        // int(text, 0): same base detection as PyLong_FromString(text, NULL, 0)
        let result = Python::with_gil(|py| {
            py.get_type_bound::<PyLong>()
                .call1((text, 0))
                .map(|value| value.unbind())
        });
        self.capture(result)
    }

    fn new_str(&mut self, text: &str) -> RuntimeResult<PyObject> {
        Ok(Python::with_gil(|py| text.into_py(py)))
    }

    fn new_path(&mut self, path: &Path) -> RuntimeResult<PyObject> {
        // Non-UTF-8 text goes through the filesystem decoder, as in os.fsdecode
        Ok(Python::with_gil(|py| path.as_os_str().to_object(py)))
    }

    fn new_bool(&mut self, value: bool) -> RuntimeResult<PyObject> {
        Ok(Python::with_gil(|py| value.into_py(py)))
    }

    fn exit_status(&mut self, value: &PyObject) -> i32 {
        Python::with_gil(|py| status_from_value(value.bind(py)))
    }

    fn print_error(&mut self) {
        if let Some(err) = self.pending.take() {
            Python::with_gil(|py| err.print(py));
        }
    }

    fn finalize(&mut self) -> RuntimeResult<()> {
        if unsafe { ffi::Py_IsInitialized() } == 0 {
            return Ok(());
        }
        if let Some(err) = self.pending.take() {
            Python::with_gil(|_| drop(err));
        }
        if unsafe { ffi::Py_FinalizeEx() } < 0 {
            return Err(RuntimeFault::new("Failed to flush buffered output on shutdown."));
        }
        Ok(())
    }
}
