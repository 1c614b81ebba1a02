//! Compile-time limits for the rule compiler and the logging layer
//!
//! These are hard bounds enforced while reading untrusted rule sources. They
//! are not runtime preferences and cannot be changed through the environment.

pub mod compile_time {
    pub mod lexical {
        /// Maximum rule source size accepted by the lexer (4MB)
        pub const MAX_SOURCE_SIZE: usize = 4 * 1024 * 1024;

        /// Maximum length of rule, string and meta identifiers
        pub const MAX_IDENTIFIER_LENGTH: usize = 128;

        /// Maximum decoded size of a single text string, hex string or regex
        pub const MAX_STRING_SIZE: usize = 64 * 1024;

        /// Maximum number of tokens in one rule source
        pub const MAX_TOKEN_COUNT: usize = 1_000_000;
    }

    pub mod syntax {
        /// Maximum nesting depth of condition expressions
        pub const MAX_CONDITION_DEPTH: usize = 64;
    }

    pub mod rules {
        /// Maximum rules in one compiled set
        pub const MAX_RULES: usize = 100_000;

        /// Maximum strings declared in a single rule
        pub const MAX_STRINGS_PER_RULE: usize = 10_000;

        /// Maximum span of a single hex jump `[n-m]`
        pub const MAX_HEX_JUMP: u32 = 4_096;

        /// Compiled program size limit handed to the regex builder
        pub const REGEX_SIZE_LIMIT: usize = 10 * 1024 * 1024;
    }

    pub mod logging {
        /// Events retained by the in-memory logger before the oldest are dropped
        pub const LOG_BUFFER_SIZE: usize = 10_000;

        /// Messages longer than this are truncated before emission
        pub const MAX_LOG_MESSAGE_LENGTH: usize = 10_000;
    }
}
