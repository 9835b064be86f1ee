//! Generator of Rust abstract syntax types and of a bridge from C parsers,
//! driven by a grammar description.

pub mod absyn;
pub mod bridge;
pub mod build;
pub mod generate;
pub mod grammar;
pub mod names;
pub mod pretty;
pub mod reachability;
pub mod syntax;
pub mod types;
pub mod util;
