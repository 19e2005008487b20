//! `cinch` turns a set of declared operations into a navigable, hierarchical
//! command-line tool.
//!
//! Callers describe commands with [`CommandDescriptor`]s (a group of named
//! operations, optionally nested), register them on a [`ToolBuilder`], and run
//! the resulting [`Tool`] against an argument vector. The dispatcher walks the
//! command tree one path segment at a time, resolves names and synonyms,
//! renders contextual help, and invokes the matching leaf operation. Results
//! and help text are written through a layered output pipeline: four named
//! channels, a decorator chain of formatters, and an interval-based ANSI
//! color renderer.
//!
//! Argument coercion and structured (JSON/YAML) formatting are contracts, not
//! implementations: bring an [`InputParser`] and, if needed, an
//! [`OutputFormatter`] of your own.

pub mod constants;
pub mod core;
pub mod models;
pub mod output;

pub use crate::core::builder::ToolBuilder;
pub use crate::core::dispatch::{
    BannerSupplier, DispatchError, ErrorHandler, InvocationContext, Tool,
};
pub use crate::core::input::{InputError, InputParser, NullInput};
pub use crate::core::registry::{CommandNode, CommandTree, Group, RegistryError};
pub use crate::models::{
    ActionArgs, ActionError, CommandDescriptor, ErrorKind, Operation, ParamBinding, ParamSpec,
    ParamType, ParamValue,
};
pub use crate::output::ansi::{AnsiColorOutput, AnsiColorOutputBuilder, ColorConfig, ansi_env_enabled};
pub use crate::output::channels::{Channel, ChannelOutput, ChannelOutputBuilder};
pub use crate::output::color::{AnsiColor, ColorSpan, Colorized, render};
pub use crate::output::format::{
    FormattedOutput, NiceFormatter, OutputFormatter, PrefixFormatter, ToStringFormatter,
};
pub use crate::output::sink::{CommandOutput, MemoryOutput, OutputValue, SystemOutput};
