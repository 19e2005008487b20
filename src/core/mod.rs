// src/core/mod.rs

pub mod builder;
pub mod dispatch;
pub(crate) mod help;
pub mod input;
pub mod registry;
