//! Zip package access for the local scanner

pub mod error;
pub mod reader;

pub use error::ArchiveError;
pub use reader::{
    decode_content, is_safe_entry_name, ArchiveEntry, ArchiveFile, ArchiveLimits, ArchiveReader,
};
