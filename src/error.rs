//! Rebalancer error abstractions.

use thiserror::Error;

/// Rebalancer error variants.
///
/// Degraded outcomes such as insufficient capacity are not errors. They are reported as
/// diagnostics on a successful outcome instead.
#[derive(Debug, Error)]
pub enum RebalanceError {
    /// The given input snapshot violates the input contract.
    #[error("validation error: {0}")]
    InvalidInput(String),
    /// The rebalancer options could not be loaded.
    #[error("error loading rebalancer options: {0}")]
    Config(anyhow::Error),
    /// A record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(anyhow::Error),
}

/// A result type where the error is a `RebalanceError`.
pub type Result<T> = ::std::result::Result<T, RebalanceError>;
