//! Crate-wide error type.
//!
//! One variant per error kind named in the reconstruction design: data-contract
//! violations on proton records, configuration mismatches between MLP variants
//! and requested features, geometry shortfalls, unsupported numerical
//! operations, and propagated I/O failures from the (external) image layer.

use std::fmt;

/// Errors produced by the reconstruction core.
#[derive(thiserror::Error, Debug)]
pub enum ReconError {
    /// A proton-pair record violates the z-ordering or direction-sign contract.
    #[error("data contract violation: {0}")]
    DataContract(String),

    /// An unsupported combination of MLP variant and requested feature was configured.
    #[error("configuration error: {0}")]
    Config(String),

    /// The geometry oracle could not answer a query needed by a filter.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A requested numerical operation is not supported by the given model.
    #[error("numerical operation not supported: {0}")]
    Numerical(String),

    /// Propagated failure from the external image I/O layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    pub fn data_contract(msg: impl fmt::Display) -> Self {
        ReconError::DataContract(msg.to_string())
    }

    pub fn config(msg: impl fmt::Display) -> Self {
        ReconError::Config(msg.to_string())
    }

    pub fn geometry(msg: impl fmt::Display) -> Self {
        ReconError::Geometry(msg.to_string())
    }

    pub fn numerical(msg: impl fmt::Display) -> Self {
        ReconError::Numerical(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
