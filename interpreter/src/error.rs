use std::fmt;

use nepo::config::{MotorPort, SensorPort};

/// A failure inside a block handler. These halt the run: after a
/// half-applied actuation the hardware state can no longer be trusted.
#[derive(Debug)]
pub enum RuntimeError {
    TypeError {
        expected: &'static str,
        got: &'static str,
    },
    UnknownMotorPort(String),
    UnknownSensorPort(String),
    MotorNotBound(MotorPort),
    SensorMismatch {
        port: SensorPort,
        expected: &'static str,
    },
    ExpressionTooDeep,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeError { expected, got } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            RuntimeError::UnknownMotorPort(field) => {
                write!(f, "unknown motor port '{}'", field)
            }
            RuntimeError::UnknownSensorPort(field) => {
                write!(f, "unknown sensor port '{}'", field)
            }
            RuntimeError::MotorNotBound(port) => {
                write!(f, "no motor configured on port {}", port)
            }
            RuntimeError::SensorMismatch { port, expected } => {
                write!(f, "port {} has no {} sensor configured", port, expected)
            }
            RuntimeError::ExpressionTooDeep => {
                write!(f, "expression nesting too deep")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// A RuntimeError enriched with the block type (and slot, where known)
/// it was raised in; this is the failure info the host reads back.
#[derive(Debug)]
pub struct BlockError {
    pub block_type: String,
    pub slot: Option<String>,
    pub error: RuntimeError,
}

impl BlockError {
    pub fn new(block_type: &str, slot: Option<&str>, error: RuntimeError) -> Self {
        BlockError {
            block_type: block_type.to_string(),
            slot: slot.map(|s| s.to_string()),
            error,
        }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Some(slot) => write!(f, "{} [{}]: {}", self.block_type, slot, self.error),
            None => write!(f, "{}: {}", self.block_type, self.error),
        }
    }
}

impl std::error::Error for BlockError {}

/// A diagnostic that did not stop the run: unknown block types, safety
/// ceilings, ignored fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct RunWarning {
    pub block_type: String,
    pub message: String,
}

impl RunWarning {
    pub fn new(block_type: &str, message: impl Into<String>) -> Self {
        RunWarning {
            block_type: block_type.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.block_type, self.message)
    }
}

/// How a run ended. The host never sees a raw platform error.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    Completed,
    StoppedByHost,
    ConfigurationError(String),
    FatalError(String),
}

impl TerminationReason {
    pub fn is_completed(&self) -> bool {
        matches!(self, TerminationReason::Completed)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Completed => write!(f, "completed"),
            TerminationReason::StoppedByHost => write!(f, "stopped by host"),
            TerminationReason::ConfigurationError(msg) => {
                write!(f, "configuration error: {}", msg)
            }
            TerminationReason::FatalError(msg) => write!(f, "fatal error: {}", msg),
        }
    }
}
