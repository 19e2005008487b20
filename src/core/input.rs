// src/core/input.rs

use thiserror::Error;

use crate::models::{ParamType, ParamValue};

/// A parameter failed to parse from the argument vector.
#[derive(Error, Debug)]
#[error("Invalid input for --{param}: {reason}")]
pub struct InputError {
    pub param: String,
    pub reason: String,
}

impl InputError {
    pub fn new(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            reason: reason.into(),
        }
    }
}

/// The pluggable argument parser contract. Concrete coercion strategies live
/// outside the core; the dispatcher only needs these two capabilities.
pub trait InputParser: Send + Sync {
    /// Resolve the value for one declared parameter of `command` from the
    /// remaining argument vector.
    fn parse_args(
        &self,
        command: &str,
        args: &[String],
        ty: &ParamType,
        param: &str,
    ) -> Result<ParamValue, InputError>;

    /// A help line for one declared parameter of `command`.
    fn help(&self, command: &str, ty: &ParamType, param: &str) -> String;
}

/// The safe default parser: rejects every parsed parameter. Tools whose
/// operations only take the output sink or the raw argument vector never
/// need anything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInput;

impl InputParser for NullInput {
    fn parse_args(
        &self,
        _command: &str,
        _args: &[String],
        _ty: &ParamType,
        param: &str,
    ) -> Result<ParamValue, InputError> {
        Err(InputError::new(param, "no input parser is configured"))
    }

    fn help(&self, _command: &str, ty: &ParamType, param: &str) -> String {
        format!("  --{param} <{}>", ty.label())
    }
}
