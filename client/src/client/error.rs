//! Error types for the admin client.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors that can occur while talking to the daemon's admin interface.
#[derive(Debug)]
pub enum ClientError {
    /// An I/O error on the daemon connection, including dial failures and
    /// per-query timeouts.
    Io(io::Error),
    /// The reply stream could not be decoded. Replies can no longer be paired
    /// with requests afterwards, so the connection is unusable.
    Codec(serde_json::Error),
    /// The daemon answered a non-tolerant query with a non-success status.
    Protocol {
        /// The status string the daemon reported.
        status: String,
    },
    /// A reply arrived without the shape its request implies.
    MalformedReply(&'static str),
    /// The client was used after its connection failed.
    NotConnected,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(err) => write!(f, "Daemon connection error: {err}"),
            ClientError::Codec(err) => write!(f, "Unreadable reply stream: {err}"),
            ClientError::Protocol { status } => {
                write!(f, "Query failed with status {status:?}")
            }
            ClientError::MalformedReply(what) => write!(f, "Malformed reply: {what}"),
            ClientError::NotConnected => {
                write!(f, "Client connection is gone, establish a new client")
            }
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Io(err) => Some(err),
            ClientError::Codec(err) => Some(err),
            ClientError::Protocol { .. } => None,
            ClientError::MalformedReply(_) => None,
            ClientError::NotConnected => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        ClientError::Io(err)
    }
}

impl ClientError {
    /// Whether the error leaves the connection unusable.
    ///
    /// Transport faults desynchronize the request/reply pairing, which relies
    /// purely on ordering. Status-level failures leave the stream intact.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::Codec(_) | ClientError::NotConnected
        )
    }
}
