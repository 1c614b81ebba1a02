//! Syntax analysis: token stream to rule syntax tree

mod error;
mod parser;

pub use error::{SyntaxError, SyntaxResult};
pub use parser::RuleParser;

use crate::grammar::ast::nodes::RuleSource;
use crate::tokens::TokenStream;
use crate::{log_debug, log_error};

pub fn parse_rule_source(token_stream: TokenStream) -> SyntaxResult<RuleSource> {
    let token_count = token_stream.len();
    let result = RuleParser::new(token_stream).parse_rule_source();

    match &result {
        Ok(source) => {
            log_debug!("Rule source parsed",
                "tokens" => token_count,
                "rules" => source.rules.len()
            );
        }
        Err(error) => {
            log_error!(error.error_code(), "Rule source failed to parse",
                span = error.span(),
                "error" => error
            );
        }
    }

    result
}
