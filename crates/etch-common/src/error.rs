//! Common error types for etch.

use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`EtchError`].
pub type EtchResult<T> = Result<T, EtchError>;

/// Errors raised while provisioning a file onto a block device.
#[derive(Error, Diagnostic, Debug)]
pub enum EtchError {
    /// Invalid or inconsistent input.
    #[error("Invalid input: {message}")]
    #[diagnostic(code(etch::validation))]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// Invalid octal mode.
    #[error("Invalid mode: {value}")]
    #[diagnostic(
        code(etch::validation::mode),
        help("Modes are octal permission bits such as '0644' or '755'")
    )]
    InvalidMode {
        /// The rejected value.
        value: String,
    },

    /// Invalid duration string.
    #[error("Invalid duration: {value}")]
    #[diagnostic(
        code(etch::validation::duration),
        help("Use formats like '90s', '2m', '1h30m' or '500ms'")
    )]
    InvalidDuration {
        /// The rejected value.
        value: String,
    },

    /// Mounting the block device failed.
    #[error("Mounting [{device}] -> [{target}] failed: {source}")]
    #[diagnostic(
        code(etch::mount),
        help("Check that the device exists, holds the given filesystem and that etch runs privileged")
    )]
    Mount {
        /// The block device.
        device: String,
        /// The mountpoint.
        target: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("Failed to {operation} {path}: {source}")]
    #[diagnostic(code(etch::filesystem))]
    Filesystem {
        /// The operation that failed (e.g. "create directory").
        operation: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A path that should be a directory is something else.
    #[error("Expected {path} to be a directory, but it is a file")]
    #[diagnostic(code(etch::filesystem::conflict))]
    PathConflict {
        /// The conflicting path.
        path: PathBuf,
    },

    /// A path cannot be decomposed into a directory hierarchy.
    #[error("Bad path: {path}")]
    #[diagnostic(code(etch::filesystem::bad_path))]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// Network request failure.
    #[error("Network error: {message}")]
    #[diagnostic(code(etch::network))]
    Network {
        /// The error message.
        message: String,
    },

    /// Every metadata endpoint failed.
    #[error("Failed to read user-data, exhausted all the urls: {endpoints}")]
    #[diagnostic(
        code(etch::metadata::exhausted),
        help("At least one metadata endpoint must be reachable")
    )]
    MetadataExhausted {
        /// The endpoint list as given.
        endpoints: String,
    },

    /// Template rendering failure.
    #[error("Failed to render {template}: {message}")]
    #[diagnostic(code(etch::render))]
    Render {
        /// Template name.
        template: &'static str,
        /// The error message.
        message: String,
    },

    /// Switching network namespaces failed.
    #[error("Failed to enter network namespace {path}: {source}")]
    #[diagnostic(
        code(etch::namespace),
        help("Entering the host network namespace requires CAP_SYS_ADMIN and a host PID namespace")
    )]
    Namespace {
        /// Namespace file.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// No usable network interface.
    #[error("Network interface not found: {name}")]
    #[diagnostic(code(etch::network::interface))]
    InterfaceNotFound {
        /// The interface name, or a description of the lookup.
        name: String,
    },

    /// DHCP exchange failure.
    #[error("DHCP error: {message}")]
    #[diagnostic(code(etch::dhcp))]
    Dhcp {
        /// The error message.
        message: String,
    },

    /// DHCP exchange did not complete in time.
    #[error("DHCP on {interface} timed out after {timeout:?}")]
    #[diagnostic(
        code(etch::dhcp::timeout),
        help("Increase DHCP_TIMEOUT or check that a DHCP server answers on this segment")
    )]
    DhcpTimeout {
        /// Interface the exchange ran on.
        interface: String,
        /// The elapsed bound.
        timeout: Duration,
    },

    /// The boot configuration tool failed.
    #[error("Error running bootconfig tool {tool}: {message}, output: {output}")]
    #[diagnostic(code(etch::bootconfig))]
    BootConfig {
        /// Tool path.
        tool: PathBuf,
        /// Exit status or spawn error.
        message: String,
        /// Captured stdout and stderr.
        output: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(etch::io))]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    #[diagnostic(code(etch::internal))]
    Internal {
        /// The error message.
        message: String,
    },
}

impl EtchError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation and path it came from.
    pub fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }
}
