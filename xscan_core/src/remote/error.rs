use xscan_rules::logging::{codes, Code};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure: connect, DNS, timeout or an unreadable body
    #[error("scanner unavailable: {reason}")]
    Unavailable { reason: String },

    /// The service answered, but not with a usable result
    #[error("scanner returned an error response (status {status}): {body}")]
    Response { status: u16, body: String },
}

impl RemoteError {
    pub fn error_code(&self) -> Code {
        match self {
            RemoteError::Unavailable { .. } => codes::scanner::SCANNER_UNAVAILABLE,
            RemoteError::Response { .. } => codes::scanner::SCANNER_RESPONSE_ERROR,
        }
    }
}
