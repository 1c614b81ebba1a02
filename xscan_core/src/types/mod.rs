pub mod common;
pub mod result;

pub use common::*;
pub use result::*;
