//! Octal permission modes.
//!
//! Accepts the forms provisioning templates use: "0644", "644", "0o755".

use std::fmt;
use std::str::FromStr;

use crate::error::{EtchError, EtchResult};

/// Permission bits for a file or directory, including setuid/setgid/sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    /// Highest accepted value (`07777`).
    pub const MAX: u32 = 0o7777;

    /// Create a mode from raw bits.
    ///
    /// # Errors
    ///
    /// Returns an error if bits beyond `07777` are set.
    pub fn from_bits(bits: u32) -> EtchResult<Self> {
        if bits > Self::MAX {
            return Err(EtchError::InvalidMode {
                value: format!("{bits:o}"),
            });
        }
        Ok(Self(bits))
    }

    /// Raw permission bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Parse an octal mode string.
    pub fn parse(s: &str) -> EtchResult<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(EtchError::InvalidMode {
                value: s.to_string(),
            });
        }

        let bits = u32::from_str_radix(digits, 8).map_err(|_| EtchError::InvalidMode {
            value: s.to_string(),
        })?;

        Self::from_bits(bits).map_err(|_| EtchError::InvalidMode {
            value: s.to_string(),
        })
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl FromStr for FileMode {
    type Err = EtchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
