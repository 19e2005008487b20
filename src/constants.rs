// src/constants.rs

use lazy_static::lazy_static;

lazy_static! {
    /// Tokens recognized as a request for help at every level of dispatch.
    pub static ref DEFAULT_HELP_TOKENS: Vec<String> =
        ["-h", "--help", "help", "?"].iter().map(ToString::to_string).collect();
}

/// Process exit status used when a failed top-level run asked for exit semantics.
pub const EXIT_FAILURE: i32 = 2;
