use core::fmt;

/// Errors which can be returned by the clock tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The named clock is not registered in the tree.
    UnknownClock(String),
    /// A frequency is out of its declared bounds, or was requested from a
    /// clock that has no notion of frequency.
    InvalidFrequency(String),
    /// A divider encoding could not be mapped to a divisor.
    InvalidDivider(String),
    /// A divider resolved a divisor of zero without being allowed to gate.
    DivideByZero(String),
    /// A multiplexer selector value has no matching input.
    InvalidSelector {
        /// Name of the multiplexer.
        clock: String,
        /// The raw selector value.
        selector: u64,
    },
    /// The clock has no name, or is not attached to a tree.
    Detached,
    /// A field required to answer the query was never configured.
    Misconfigured(String),
    /// An error which originates from the register field implementation.
    Register(String),
    /// A clock tree description could not be loaded.
    Description(String),
}

impl Error {
    /// Convenience function for creating register access errors.
    pub fn register<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self::Register(message.into())
    }

    /// Convenience function for creating description errors.
    pub fn description<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self::Description(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownClock(name) => write!(f, "unknown clock '{name}'"),
            Self::InvalidFrequency(message) => write!(f, "invalid frequency: {message}"),
            Self::InvalidDivider(message) => write!(f, "invalid divider: {message}"),
            Self::DivideByZero(name) => write!(f, "clock '{name}' divides by zero"),
            Self::InvalidSelector { clock, selector } => {
                write!(f, "multiplexer '{clock}' has no input for selector {selector}")
            }
            Self::Detached => write!(f, "clock has no name or is not attached to a tree"),
            Self::Misconfigured(message) => write!(f, "misconfigured clock: {message}"),
            Self::Register(message) => write!(f, "register access failed: {message}"),
            Self::Description(message) => write!(f, "invalid clock tree description: {message}"),
        }
    }
}

impl core::error::Error for Error {}
