use thiserror::Error;

/// Error kinds surfaced by the core. See spec §7 for the propagation
/// policy: `InvalidOrderState` and `InvalidConfig` are recovered
/// locally by their caller, `Numeric` and `Canceled` abort the
/// enclosing job/phase.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid order state: {0}")]
    InvalidOrderState(String),

    #[error("invalid strategy config: {0}")]
    InvalidConfig(String),

    #[error("numeric error: {0}")]
    Numeric(String),

    #[error("operation canceled")]
    Canceled,

    /// Reserved for external collaborators (CSV/file I/O) that wrap this
    /// error type. Never constructed by this crate.
    #[error("io error: {0}")]
    Io(String),
}
