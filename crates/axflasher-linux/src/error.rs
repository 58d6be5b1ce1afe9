//! Error types for the Linux backend

use thiserror::Error;

/// Errors raised while setting up the Linux backend
///
/// Request-level failures are mapped straight into
/// [`axflasher_core::Error`] at the trait boundary; only setup has its own
/// error type.
#[derive(Debug, Error)]
pub enum LinuxBackendError {
    /// Failed to create the control socket
    #[error("failed to create control socket: {0}")]
    Socket(#[source] nix::Error),
}

/// Result type for Linux backend setup
pub type Result<T> = std::result::Result<T, LinuxBackendError>;
