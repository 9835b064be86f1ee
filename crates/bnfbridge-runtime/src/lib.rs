//! Runtime support for code generated by `bnfbridge`.

pub mod file;

pub use crate::file::{NativeFile, NativeFileError};
