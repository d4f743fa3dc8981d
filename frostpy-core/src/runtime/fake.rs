//! Instrumented in-memory runtime for tests
//!
//! Records every import, call and published attribute, counts acquired and
//! released handles, and can be told to fail at any stage.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{NativeConfig, Runtime, RuntimeResult};
use crate::error::RuntimeFault;

#[derive(Debug, Default)]
pub struct Counters {
    configs_acquired: Cell<usize>,
    configs_released: Cell<usize>,
    objects_acquired: Cell<usize>,
    objects_released: Cell<usize>,
}

impl Counters {
    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeValue {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Module(String),
    Function(String),
}

#[derive(Debug)]
pub struct FakeObject {
    value: FakeValue,
    counters: Rc<Counters>,
}

impl FakeObject {
    pub fn value(&self) -> &FakeValue {
        &self.value
    }
}

impl Drop for FakeObject {
    fn drop(&mut self) {
        Counters::bump(&self.counters.objects_released);
    }
}

/// One setter call applied to a [`FakeConfig`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOp {
    SearchPathsPreset(bool),
    WriteBytecode(bool),
    StdlibDir(PathBuf),
    ProgramName(PathBuf),
    ParseArgv(bool),
    Argv(Vec<OsString>),
}

#[derive(Debug)]
pub struct FakeConfig {
    ops: Vec<ConfigOp>,
    failing_field: Option<&'static str>,
    counters: Rc<Counters>,
}

impl FakeConfig {
    fn string_field(&mut self, field: &'static str, op: ConfigOp) -> RuntimeResult<()> {
        if self.failing_field == Some(field) {
            return Err(RuntimeFault::new(format!("cannot decode {}", field)));
        }
        self.ops.push(op);
        Ok(())
    }
}

impl NativeConfig for FakeConfig {
    fn set_search_paths_preset(&mut self, preset: bool) {
        self.ops.push(ConfigOp::SearchPathsPreset(preset));
    }

    fn set_write_bytecode(&mut self, write: bool) {
        self.ops.push(ConfigOp::WriteBytecode(write));
    }

    fn set_stdlib_dir(&mut self, dir: &Path) -> RuntimeResult<()> {
        self.string_field("stdlib_dir", ConfigOp::StdlibDir(dir.to_path_buf()))
    }

    fn set_program_name(&mut self, program: &Path) -> RuntimeResult<()> {
        self.string_field("program_name", ConfigOp::ProgramName(program.to_path_buf()))
    }

    fn set_parse_argv(&mut self, parse: bool) {
        self.ops.push(ConfigOp::ParseArgv(parse));
    }

    fn set_argv(&mut self, argv: &[OsString]) -> RuntimeResult<()> {
        self.string_field("argv", ConfigOp::Argv(argv.to_vec()))
    }
}

impl Drop for FakeConfig {
    fn drop(&mut self) {
        Counters::bump(&self.counters.configs_released);
    }
}

/// Fake host. Public fields are the knobs and the recordings.
#[derive(Debug)]
pub struct FakeRuntime {
    counters: Rc<Counters>,
    pending_error: bool,

    // Knobs
    pub missing_modules: HashSet<String>,
    pub missing_attrs: HashSet<String>,
    pub failing_calls: HashSet<String>,
    /// Calls that end by requesting process exit, keyed by `module.function`
    pub exits_with: HashMap<String, i32>,
    pub failing_attribute: Option<String>,
    pub failing_config_field: Option<&'static str>,
    pub fail_init: bool,
    pub fail_bool: bool,
    pub fail_finalize: bool,
    /// Values returned by calls, keyed by `module.function`
    pub returns: HashMap<String, FakeValue>,
    pub main_status: i32,

    // Recordings
    pub init_calls: usize,
    pub initialized_with: Option<Vec<ConfigOp>>,
    pub imports: Vec<String>,
    pub calls: Vec<(String, Vec<FakeValue>)>,
    pub attributes: Vec<(String, FakeValue)>,
    pub ran_main: bool,
    pub errors_printed: usize,
    pub finalized: bool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            counters: Rc::new(Counters::default()),
            pending_error: false,
            missing_modules: HashSet::new(),
            missing_attrs: HashSet::new(),
            failing_calls: HashSet::new(),
            exits_with: HashMap::new(),
            failing_attribute: None,
            failing_config_field: None,
            fail_init: false,
            fail_bool: false,
            fail_finalize: false,
            returns: HashMap::new(),
            main_status: 0,
            init_calls: 0,
            initialized_with: None,
            imports: Vec::new(),
            calls: Vec::new(),
            attributes: Vec::new(),
            ran_main: false,
            errors_printed: 0,
            finalized: false,
        }
    }

    pub fn configs_acquired(&self) -> usize {
        self.counters.configs_acquired.get()
    }

    pub fn configs_released(&self) -> usize {
        self.counters.configs_released.get()
    }

    /// Objects acquired but not yet released
    pub fn live_objects(&self) -> usize {
        self.counters.objects_acquired.get() - self.counters.objects_released.get()
    }

    pub fn objects_acquired(&self) -> usize {
        self.counters.objects_acquired.get()
    }

    pub fn calls_to(&self, function: &str) -> Vec<Vec<FakeValue>> {
        self.calls
            .iter()
            .filter(|(name, _)| name == function)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn object(&self, value: FakeValue) -> FakeObject {
        Counters::bump(&self.counters.objects_acquired);
        FakeObject {
            value,
            counters: Rc::clone(&self.counters),
        }
    }

    fn fault<T>(&mut self, message: impl Into<String>) -> RuntimeResult<T> {
        self.pending_error = true;
        Err(RuntimeFault::new(message))
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for FakeRuntime {
    type Object = FakeObject;
    type Config = FakeConfig;

    fn new_config(&mut self) -> FakeConfig {
        Counters::bump(&self.counters.configs_acquired);
        FakeConfig {
            ops: Vec::new(),
            failing_field: self.failing_config_field,
            counters: Rc::clone(&self.counters),
        }
    }

    fn initialize(&mut self, config: &FakeConfig) -> RuntimeResult<()> {
        if self.init_calls > 0 {
            return self.fault("runtime already initialized");
        }
        self.init_calls += 1;
        if self.fail_init {
            return self.fault("fatal error during initialization");
        }
        self.initialized_with = Some(config.ops.clone());
        Ok(())
    }

    fn run_main(&mut self) -> i32 {
        self.ran_main = true;
        self.main_status
    }

    fn import(&mut self, name: &str) -> RuntimeResult<FakeObject> {
        self.imports.push(name.to_string());
        if self.missing_modules.contains(name) {
            return self.fault(format!("No module named '{}'", name));
        }
        Ok(self.object(FakeValue::Module(name.to_string())))
    }

    fn get_attr(&mut self, object: &FakeObject, name: &str) -> RuntimeResult<FakeObject> {
        let FakeValue::Module(module) = &object.value else {
            return self.fault(format!("{:?} has no attribute '{}'", object.value, name));
        };
        let qualified = format!("{}.{}", module, name);
        if self.missing_attrs.contains(&qualified) {
            return self.fault(format!("module '{}' has no attribute '{}'", module, name));
        }
        Ok(self.object(FakeValue::Function(qualified)))
    }

    fn call(&mut self, callable: &FakeObject, args: &[&FakeObject]) -> RuntimeResult<FakeObject> {
        let FakeValue::Function(name) = &callable.value else {
            return self.fault(format!("{:?} is not callable", callable.value));
        };
        let name = name.clone();
        self.calls
            .push((name.clone(), args.iter().map(|arg| arg.value.clone()).collect()));
        if self.failing_calls.contains(&name) {
            return self.fault(format!("{} raised", name));
        }
        if let Some(&status) = self.exits_with.get(&name) {
            return Err(RuntimeFault::exit(status));
        }
        let value = self.returns.get(&name).cloned().unwrap_or(FakeValue::None);
        Ok(self.object(value))
    }

    fn set_process_attribute(&mut self, name: &str, value: &FakeObject) -> RuntimeResult<()> {
        if self.failing_attribute.as_deref() == Some(name) {
            return self.fault(format!("cannot set {}", name));
        }
        self.attributes.push((name.to_string(), value.value.clone()));
        Ok(())
    }

    fn new_int(&mut self, text: &str) -> RuntimeResult<FakeObject> {
        let parsed = match text.strip_prefix("0x") {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => text.parse(),
        };
        match parsed {
            Ok(value) => Ok(self.object(FakeValue::Int(value))),
            Err(_) => self.fault(format!("invalid literal for int() with base 0: '{}'", text)),
        }
    }

    fn new_str(&mut self, text: &str) -> RuntimeResult<FakeObject> {
        Ok(self.object(FakeValue::Str(text.to_string())))
    }

    fn new_path(&mut self, path: &Path) -> RuntimeResult<FakeObject> {
        Ok(self.object(FakeValue::Str(path.to_string_lossy().into_owned())))
    }

    fn new_bool(&mut self, value: bool) -> RuntimeResult<FakeObject> {
        if self.fail_bool {
            return self.fault("cannot build bool");
        }
        Ok(self.object(FakeValue::Bool(value)))
    }

    fn exit_status(&mut self, value: &FakeObject) -> i32 {
        match value.value {
            FakeValue::None => 0,
            FakeValue::Int(code) => i32::try_from(code).unwrap_or(1),
            _ => 1,
        }
    }

    fn print_error(&mut self) {
        if std::mem::take(&mut self.pending_error) {
            self.errors_printed += 1;
        }
    }

    fn finalize(&mut self) -> RuntimeResult<()> {
        if self.initialized_with.is_none() || self.ran_main {
            return Ok(());
        }
        self.finalized = true;
        if self.fail_finalize {
            return Err(RuntimeFault::new("could not flush sys.stdout"));
        }
        Ok(())
    }
}
