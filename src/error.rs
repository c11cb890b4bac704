use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Failed to read trace: {0}")]
    TraceError(#[from] TraceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Fatal configuration errors, raised while a hierarchy is being built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{cache}: associativity {ways} exceeds the maximum of {max} ways")]
    TooManyWays { cache: String, ways: usize, max: usize },

    #[error("{cache}: associativity must be at least 1")]
    ZeroWays { cache: String },

    #[error("{param} must be a power of two, got {value}")]
    NotPowerOfTwo { param: String, value: u64 },

    #[error(
        "{cache}: capacity {size} is not a multiple of line size {line_size} x {ways} ways"
    )]
    CapacityMismatch {
        cache: String,
        size: u64,
        line_size: u64,
        ways: usize,
    },

    #[error("line size {line_size} is larger than the {page_size}-byte page")]
    LineLargerThanPage { line_size: u64, page_size: u64 },

    #[error("mode {mode} requires exactly {expected} cores, got {cores}")]
    CoreCount {
        mode: String,
        expected: usize,
        cores: usize,
    },

    #[error("core count must be at least 1")]
    NoCores,

    #[error("replacement policy '{0}' has no victim selection rule")]
    UnsupportedPolicy(String),

    #[error("{cache}: static partition gives core 0 {core0_ways} of {ways} ways")]
    InvalidPartition {
        cache: String,
        core0_ways: usize,
        ways: usize,
    },
}

/// Errors related to reading an access trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse trace file '{0}' at line {1}: {2}")]
    ParseError(PathBuf, usize, String),

    #[error("Trace file '{0}' record {1}: core {2} out of range for {3} core(s)")]
    CoreOutOfRange(PathBuf, usize, usize, usize),
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
