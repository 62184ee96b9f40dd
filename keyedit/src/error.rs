//! Error type.

use std::fmt;
use std::io;

/// The various errors that can be returned while editing a key.
#[derive(Debug)]
pub enum Error {
    /// The user ID is already signed by the signing key.
    AlreadySigned(String),
    /// The backend rejected the passphrase.
    BadPassphrase {
        uid_hint: Option<String>,
        key_id: Option<String>,
    },
    /// The user canceled a passphrase request.
    Canceled,
    /// The backend ignored the requested subkey algorithm because it is not in
    /// expert mode.
    CustomizationIgnored,
    /// The options were rejected before a session was started.
    InvalidOptions(&'static str),
    /// The backend kept reporting a missing passphrase.
    MissingPassphrase,
    /// The session was aborted before the backend finished.
    Aborted,
    /// The backend finished with a failure.
    Backend { code: Option<i32> },
    /// The backend binary could not be found.
    BackendNotFound,
    /// An I/O error occurred while talking to the backend.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AlreadySigned(which) => write!(f, "User ID is already signed ({})", which),
            Error::BadPassphrase { uid_hint, key_id } => {
                write!(f, "Bad passphrase")?;
                match (uid_hint, key_id) {
                    (Some(uid), _) => write!(f, " for {}", uid),
                    (None, Some(key_id)) => write!(f, " for key {}", key_id),
                    (None, None) => Ok(()),
                }
            }
            Error::Canceled => write!(f, "Passphrase entry was canceled"),
            Error::CustomizationIgnored => write!(
                f,
                "Subkey algorithm not supported by the backend (expert mode is required)"
            ),
            Error::InvalidOptions(reason) => write!(f, "Invalid options: {}", reason),
            Error::MissingPassphrase => write!(f, "No passphrase was provided"),
            Error::Aborted => write!(f, "Edit session was aborted"),
            Error::Backend { code: Some(code) } => {
                write!(f, "Backend failed with exit code {}", code)
            }
            Error::Backend { code: None } => write!(f, "Backend was terminated by a signal"),
            Error::BackendNotFound => write!(f, "Could not find the gpg binary"),
            Error::Io(e) => e.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(inner) => Some(inner),
            _ => None,
        }
    }
}
