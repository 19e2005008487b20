// src/models.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::input::InputError;
use crate::output::sink::CommandOutput;

// --- PARAMETER MODEL ---

/// Semantic type of a declared parameter, as consumed by an `InputParser`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Str,
    Int,
    Bool,
    /// A caller-defined type tag, interpreted by the configured parser.
    Custom(String),
}

impl ParamType {
    /// A short label for help output.
    pub fn label(&self) -> &str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Bool => "boolean",
            Self::Custom(tag) => tag.as_str(),
        }
    }
}

/// How a declared parameter is supplied at invocation time.
///
/// Classification happens once, when the operation is declared, not on every
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamBinding {
    /// The parameter receives the resolved `CommandOutput` sink.
    OutputSink,
    /// The parameter receives the remaining argument vector verbatim.
    RawArgs,
    /// The parameter is resolved through the configured `InputParser`.
    Parsed,
}

/// A single declared parameter of an operation.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub binding: ParamBinding,
}

impl ParamSpec {
    /// Declare a parameter resolved through the input parser.
    pub fn parsed(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            binding: ParamBinding::Parsed,
        }
    }

    /// Declare a parameter that receives the command output sink.
    pub fn output_sink() -> Self {
        Self {
            name: "output".to_string(),
            ty: ParamType::Custom("output".to_string()),
            binding: ParamBinding::OutputSink,
        }
    }

    /// Declare a parameter that receives the remaining argument vector.
    pub fn raw_args() -> Self {
        Self {
            name: "args".to_string(),
            ty: ParamType::Custom("args".to_string()),
            binding: ParamBinding::RawArgs,
        }
    }
}

/// A value produced by an `InputParser` for a parsed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
    /// The parameter was not supplied on the command line.
    Absent,
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

// --- ACTION ERRORS ---

/// Classification of an action error, used to look up a registered handler.
///
/// `Failure` is the fatal kind: unclaimed, it aborts the whole top-level run.
/// Every other unclaimed kind is reported on the error channel and the call
/// fails without propagating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A parameter failed to parse.
    Input,
    /// A fatal run failure.
    Failure,
    /// Any other error.
    Other,
    /// A caller-defined kind, matched against `handles` registrations.
    Custom(String),
}

/// An error raised by a leaf action (or by parameter resolution).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ActionError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ActionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Failure, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    pub fn custom(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Custom(tag.into()), message)
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn into_parts(self) -> (String, Option<Box<dyn std::error::Error + Send + Sync>>) {
        (self.message, self.source)
    }
}

impl From<InputError> for ActionError {
    fn from(error: InputError) -> Self {
        Self {
            kind: ErrorKind::Input,
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

// --- ACTIONS ---

static ABSENT: ParamValue = ParamValue::Absent;

/// Everything a leaf action receives: the resolved output sink, the remaining
/// argument vector, and the parsed parameter values keyed by parameter name.
/// All parameters are resolved before the action executes.
pub struct ActionArgs<'a> {
    pub(crate) output: Arc<dyn CommandOutput>,
    pub(crate) raw: &'a [String],
    pub(crate) values: HashMap<String, ParamValue>,
}

impl ActionArgs<'_> {
    pub fn output(&self) -> &Arc<dyn CommandOutput> {
        &self.output
    }

    /// The argument vector remaining after path resolution, verbatim.
    pub fn raw_args(&self) -> &[String] {
        self.raw
    }

    /// The parsed value for a declared parameter. `Absent` if the parameter
    /// was not declared as parsed or was not supplied.
    pub fn value(&self, name: &str) -> &ParamValue {
        self.values.get(name).unwrap_or(&ABSENT)
    }
}

/// The bound action of a leaf operation. The boolean result is the leaf's
/// success/failure signal.
pub type Action = Box<dyn Fn(&ActionArgs<'_>) -> Result<bool, ActionError> + Send + Sync>;

// --- DESCRIPTOR MODEL ---

/// A single invokable operation: the leaf node of the command tree.
pub struct Operation {
    pub name: String,
    pub description: Option<String>,
    pub synonyms: Vec<String>,
    pub hidden: bool,
    pub solo: bool,
    pub is_default: bool,
    pub params: Vec<ParamSpec>,
    pub(crate) action: Action,
}

impl Operation {
    pub fn new(
        name: impl Into<String>,
        action: impl Fn(&ActionArgs<'_>) -> Result<bool, ActionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            synonyms: Vec::new(),
            hidden: false,
            solo: false,
            is_default: false,
            params: Vec::new(),
            action: Box::new(action),
        }
    }

    /// An operation whose action has no success signal of its own: a normal
    /// return counts as success.
    pub fn new_void(
        name: impl Into<String>,
        action: impl Fn(&ActionArgs<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |args| action(args).map(|()| true))
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Hide the operation from listings; it stays resolvable by exact name
    /// or synonym.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Render this operation's help inline with its parent group instead of
    /// listing it. At most one operation per group may be solo.
    pub fn solo(mut self) -> Self {
        self.solo = true;
        self
    }

    /// Make this operation its group's default command.
    pub fn default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("synonyms", &self.synonyms)
            .field("hidden", &self.hidden)
            .field("solo", &self.solo)
            .field("is_default", &self.is_default)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A declarative command descriptor: a named group of operations, optionally
/// nested. This is the whole contract with the (excluded) discovery layer;
/// how a descriptor was produced is irrelevant to the core.
pub struct CommandDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub synonyms: Vec<String>,
    pub hidden: bool,
    /// Merge this descriptor's operations directly into the parent namespace
    /// instead of nesting them under the descriptor's name.
    pub transparent: bool,
    pub operations: Vec<Operation>,
    pub subcommands: Vec<CommandDescriptor>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            synonyms: Vec::new(),
            hidden: false,
            transparent: false,
            operations: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn subcommand(mut self, descriptor: CommandDescriptor) -> Self {
        self.subcommands.push(descriptor);
        self
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("transparent", &self.transparent)
            .field("operations", &self.operations)
            .field("subcommands", &self.subcommands)
            .finish_non_exhaustive()
    }
}
