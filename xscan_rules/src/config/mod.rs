//! Configuration for the rule compiler
//!
//! Hard limits live in [`constants`]; user-tunable behaviour lives in
//! [`runtime`] and defaults from the environment.

pub mod constants;
pub mod runtime;

pub use constants::compile_time;
pub use runtime::{CompilerPreferences, LoggingPreferences};
