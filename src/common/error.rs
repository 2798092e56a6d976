//! Error types for configuration loading and runtime model faults.
//!
//! Two failure classes exist: configuration problems detected at init
//! (`ConfigError`, recoverable by fixing the profiles) and model-invariant
//! violations detected mid-simulation (`ModelFault`, always fatal — they
//! indicate a bug in the simulator, not in the modeled hardware).

use std::fmt;
use std::io;

/// Errors raised while loading or validating the device and system profiles.
#[derive(Debug)]
pub enum ConfigError {
    /// A profile or trace file could not be read.
    Io(String, io::Error),

    /// A profile file is not valid TOML.
    Parse(String, toml::de::Error),

    /// A timing constraint is impossible (e.g. `t_rc < t_ras`).
    Timing(&'static str),

    /// A topology count is zero or not a power of two.
    Topology(&'static str, u64),

    /// A malformed record in a trace file, with its line number.
    Trace(usize, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read '{}': {}", path, e),
            ConfigError::Parse(path, e) => write!(f, "cannot parse '{}': {}", path, e),
            ConfigError::Timing(msg) => write!(f, "invalid timing: {}", msg),
            ConfigError::Topology(what, val) => {
                write!(f, "invalid topology: {} = {}", what, val)
            }
            ConfigError::Trace(line, msg) => write!(f, "trace line {}: {}", line, msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fatal model-invariant violations.
///
/// The controller returns one of these from `update` when the simulated
/// machine reaches a state the model forbids. The harness aborts with the
/// diagnostic; there is no recovery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelFault {
    /// Two packets scheduled onto the command bus in the same cycle.
    CommandBusCollision { cycle: u64 },

    /// Two packets scheduled onto the data bus in the same cycle.
    DataBusCollision { cycle: u64 },

    /// A non-DATA packet arrived on the data return path.
    UnexpectedPacket { cycle: u64, kind: &'static str },

    /// Read data returned with no matching pending read transaction.
    UnmatchedReadReturn { cycle: u64, addr: u64 },

    /// A command was issued before its bank timing guard was satisfied.
    GuardViolation { cycle: u64, what: &'static str },
}

impl fmt::Display for ModelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFault::CommandBusCollision { cycle } => {
                write!(f, "command bus collision at cycle {}", cycle)
            }
            ModelFault::DataBusCollision { cycle } => {
                write!(f, "data bus collision at cycle {}", cycle)
            }
            ModelFault::UnexpectedPacket { cycle, kind } => {
                write!(f, "unexpected {} packet on data return path at cycle {}", kind, cycle)
            }
            ModelFault::UnmatchedReadReturn { cycle, addr } => {
                write!(
                    f,
                    "no pending read matches returned data for {:#x} at cycle {}",
                    addr, cycle
                )
            }
            ModelFault::GuardViolation { cycle, what } => {
                write!(f, "timing guard violated at cycle {}: {}", cycle, what)
            }
        }
    }
}

impl std::error::Error for ModelFault {}
