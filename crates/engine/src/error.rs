//! Engine error type.

use thiserror::Error;

use audient_policy::PolicyError;
use audient_protocol::TransportError;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit worker is not running")]
    NotRunning,

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
