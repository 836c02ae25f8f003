//! Error types for the benchmark harness and the representations it drives.

use thiserror::Error;

use crate::trial::Operation;

/// Error variants for workload generation, trials and structure decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// A representation disagreed with the oracle. Fatal: the run is aborted.
    #[error("correctness defect: {representation} returned a wrong {operation} result in cell [{cell}]: {detail}")]
    CorrectnessDefect {
        /// Registered name of the failing representation.
        representation: &'static str,
        /// The operation whose result diverged.
        operation: Operation,
        /// Distribution, variant and density of the failing cell.
        cell: String,
        /// Expected vs. actual summary.
        detail: String,
    },

    /// The memory probe could not be initialized; probed footprints are omitted.
    #[error("memory probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// The universe size must be positive.
    #[error("invalid universe size: {0}")]
    InvalidUniverse(u32),

    /// The density is outside `(0, 1]` or yields an empty workload.
    #[error("invalid density {density} for universe size {universe}")]
    InvalidDensity {
        /// Requested density.
        density: f64,
        /// Universe size it was requested for.
        universe: u32,
    },

    /// A workload value does not fit in the universe.
    #[error("value {value} outside universe [0, {universe})")]
    ValueOutOfUniverse {
        /// Offending value.
        value: u32,
        /// Exclusive upper bound.
        universe: u32,
    },

    /// The experiment configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An index was provided that is out of the structure's bounds.
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// A selection query was performed for a rank that does not exist.
    #[error("invalid selection: rank {0} not found")]
    InvalidSelection(usize),

    /// A binary encoding could not be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// An I/O error occurred while writing the report.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
