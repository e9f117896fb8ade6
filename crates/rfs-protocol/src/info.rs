//! Server version reported by the `i` response.

use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// A `major.mid.minor` helper version.
///
/// Versions order component by component, so `1.12.8 > 1.9.30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    /// Major component.
    pub major: u32,
    /// Middle component.
    pub mid: u32,
    /// Minor component.
    pub minor: u32,
}

impl ServerVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u32, mid: u32, minor: u32) -> Self {
        Self { major, mid, minor }
    }
}

impl FromStr for ServerVersion {
    type Err = DecodeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let invalid = || DecodeError::InvalidVersion {
            text: trimmed.to_owned(),
        };
        let mut parts = trimmed.split('.').map(str::parse::<u32>);
        let mut component = || parts.next().and_then(Result::ok).ok_or_else(&invalid);
        let version = Self::new(component()?, component()?, component()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.mid, self.minor)
    }
}
