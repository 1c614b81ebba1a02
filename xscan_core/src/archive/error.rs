use std::path::PathBuf;
use xscan_rules::logging::{codes, Code};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive not found or not a readable file: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("corrupt archive {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to read entry \"{name}\": {reason}")]
    EntryRead { name: String, reason: String },

    #[error("entry \"{name}\" is {size} bytes (max {max})")]
    EntryTooLarge { name: String, size: u64, max: u64 },
}

impl ArchiveError {
    pub fn error_code(&self) -> Code {
        match self {
            ArchiveError::NotFound { .. } => codes::archive::ARCHIVE_NOT_FOUND,
            ArchiveError::Corrupt { .. } => codes::archive::CORRUPT_ARCHIVE,
            ArchiveError::EntryRead { .. } => codes::archive::ENTRY_READ_FAILURE,
            ArchiveError::EntryTooLarge { .. } => codes::archive::ENTRY_TOO_LARGE,
        }
    }

    /// Entry-level errors leave the rest of the archive readable
    pub fn is_entry_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::EntryRead { .. } | ArchiveError::EntryTooLarge { .. }
        )
    }
}
