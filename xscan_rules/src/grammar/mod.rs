//! Rule language grammar: keywords and syntax tree

pub mod ast;
pub mod keywords;

pub use ast::nodes::*;
pub use keywords::{is_reserved_keyword, Keyword};
