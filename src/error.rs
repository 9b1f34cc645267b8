//! Error taxonomy for the sensor node
//!
//! Data-path failures (`Connection`, `Write`) are surfaced to the operator
//! through diagnostics and drive the reconnect policy. Control-path failures
//! (`InvalidArgument`) are returned synchronously to the caller and never
//! affect the emission thread.

use thiserror::Error;

pub type SensorResult<T> = Result<T, SensorError>;

#[derive(Debug, Error)]
pub enum SensorError {
    /// Cannot reach the collector (fatal at startup)
    #[error("cannot reach collector: {0}")]
    Connection(String),

    /// Mid-stream send failure on an established connection
    #[error("send to collector failed: {0}")]
    Write(String),

    /// Bad control-call input; state is left unchanged
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Control-name advertisement failure (non-fatal)
    #[error("control registry: {0}")]
    Registry(String),

    /// Malformed environment configuration
    #[error("configuration: {0}")]
    Config(String),
}
