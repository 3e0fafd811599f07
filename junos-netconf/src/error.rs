use crate::message::RpcErrors;
use std::time::Duration;
use thiserror::Error;

pub type NetconfClientResult<T> = Result<T, NetconfClientError>;

#[derive(Debug, Error)]
pub enum NetconfClientError {
    #[error("could not connect to {address}: {reason}")]
    Connection { address: String, reason: String },
    #[error("authentication failed for user {user}: {reason}")]
    Authentication { user: String, reason: String },
    #[error("missing credentials: {0} is required")]
    MissingCredentials(&'static str),
    #[error("capability exchange failed: {0}")]
    Negotiation(String),
    #[error("session is not connected")]
    NotConnected,
    #[error("invalid rpc payload: {0}")]
    InvalidPayload(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("message-id mismatch (expected {expected}, actual {actual})")]
    Protocol { expected: u64, actual: u64 },
    #[error("remote procedure call failed:\n{0}")]
    Device(#[from] RpcErrors),
    #[error("no reply received within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "async-ssh2-lite")]
    #[error(transparent)]
    Ssh(#[from] async_ssh2_lite::Error),
    #[error("unknown datastore {}, (expected {:?})", unknown, expected)]
    UnknownDatastore {
        expected: Vec<String>,
        unknown: String,
    },
    #[error(
        "malformed message chunk (expected {:?}, actual {:?})",
        expected,
        actual
    )]
    MalformedChunk { expected: char, actual: char },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl NetconfClientError {
    pub fn new(msg: String) -> Self {
        NetconfClientError::Anyhow(anyhow::Error::msg(msg))
    }

    /// Whether the channel can no longer be trusted after this error.
    ///
    /// Once a fatal error has been observed mid-session the byte stream may
    /// be out of frame or out of step with the peer, so the session is
    /// closed instead of being reused.
    pub fn is_fatal(&self) -> bool {
        match self {
            NetconfClientError::Io(_)
            | NetconfClientError::MalformedChunk { .. }
            | NetconfClientError::MalformedResponse(_)
            | NetconfClientError::Protocol { .. }
            | NetconfClientError::Timeout(_) => true,
            #[cfg(feature = "async-ssh2-lite")]
            NetconfClientError::Ssh(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(NetconfClientError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(NetconfClientError::Protocol {
            expected: 1,
            actual: 2
        }
        .is_fatal());
        assert!(NetconfClientError::Io(std::io::ErrorKind::UnexpectedEof.into()).is_fatal());
        assert!(!NetconfClientError::Device(RpcErrors::default()).is_fatal());
        assert!(!NetconfClientError::InvalidPayload("bad".to_string()).is_fatal());
        assert!(!NetconfClientError::NotConnected.is_fatal());
    }

    #[test]
    fn test_display() {
        let err = NetconfClientError::Protocol {
            expected: 3,
            actual: 7,
        };
        assert_eq!(err.to_string(), "message-id mismatch (expected 3, actual 7)");
        assert_eq!(
            NetconfClientError::MissingCredentials("host").to_string(),
            "missing credentials: host is required"
        );
    }
}
