use std::error::Error;
use std::fmt;

/// Recoverable failure from a backend operation.
///
/// Every variant carries a client-facing message; the dispatcher prefixes it
/// with `"Error: "` before returning it as tool content, so `Display` prints
/// the bare message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A tool argument was malformed (for example a qualified table name that
    /// does not split into 2 or 3 components).
    InvalidArgument(String),
    /// An access token could not be obtained or was rejected.
    Auth(String),
    /// The backend API reported a failure (syntax error, permission denial,
    /// missing table, incomplete job).
    Api(String),
    /// The backend could not be reached.
    Transport(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(message)
            | Self::Auth(message)
            | Self::Api(message)
            | Self::Transport(message) => f.write_str(message),
        }
    }
}

impl Error for BackendError {}
