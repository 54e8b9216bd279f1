use thiserror::Error;
use topolive_core::TransportError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The runtime task has exited; the handle can no longer reach it.
    #[error("session runtime has shut down")]
    RuntimeClosed,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
