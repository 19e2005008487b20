// src/output/mod.rs

pub mod ansi;
pub mod channels;
pub mod color;
pub mod format;
pub mod sink;
