//! Bootstrap error types

use thiserror::Error;

/// Failure reported by the embedded runtime itself.
///
/// Carries the runtime's own description of the problem. Backends that keep a
/// richer error state (a pending exception, for instance) print it through
/// [`Runtime::print_error`](crate::runtime::Runtime::print_error).
///
/// Code running inside the runtime can also ask for the process to end
/// (`SystemExit` in CPython). That surfaces as a fault carrying the requested
/// status, and is not an error of the bootstrap.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeFault {
    pub message: String,
    pub exit_status: Option<i32>,
}

impl RuntimeFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_status: None,
        }
    }

    /// The running code asked to end the process with `status`.
    pub fn exit(status: i32) -> Self {
        Self {
            message: format!("exit requested with status {}", status),
            exit_status: Some(status),
        }
    }
}

/// Every way the bootstrap can fail. All of them are terminal for the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    #[error("{operation}: {detail}")]
    ConfigBuild { operation: String, detail: String },

    #[error("Failed to initialize the runtime from config: {detail}")]
    Init { detail: String },

    #[error("Could not set sys.{attribute}: {detail}")]
    AttributeSet { attribute: String, detail: String },

    #[error("Could not import {module} module: {detail}")]
    Import { module: String, detail: String },

    #[error("{message}")]
    Argument { message: String },

    #[error("{operation} failed: {detail}")]
    Invocation { operation: String, detail: String },
}

impl BootError {
    pub fn config_build(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        BootError::ConfigBuild {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    pub fn init(fault: RuntimeFault) -> Self {
        BootError::Init {
            detail: fault.message,
        }
    }

    pub fn attribute_set(attribute: impl Into<String>, fault: RuntimeFault) -> Self {
        BootError::AttributeSet {
            attribute: attribute.into(),
            detail: fault.message,
        }
    }

    pub fn import(module: impl Into<String>, fault: RuntimeFault) -> Self {
        BootError::Import {
            module: module.into(),
            detail: fault.message,
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        BootError::Argument {
            message: message.into(),
        }
    }

    pub fn invocation(operation: impl Into<String>, fault: RuntimeFault) -> Self {
        BootError::Invocation {
            operation: operation.into(),
            detail: fault.message,
        }
    }
}
