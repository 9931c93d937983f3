//! API versioning reported by the health endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Version of the query API.
///
/// Uses semantic versioning: major.minor.patch
/// - Major version bump: breaking changes to routes or payloads
/// - Minor version bump: additive fields or routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ApiVersion {
    /// Current API version.
    pub const CURRENT: ApiVersion = ApiVersion {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version string like "1.0.0".
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidFormat(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let field = |i: usize| -> Result<u16, VersionError> {
            parts
                .get(i)
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(invalid)
        };

        Ok(Self {
            major: field(0)?,
            minor: field(1)?,
            patch: field(2)?,
        })
    }

    /// Major versions must match; minor and patch are additive.
    pub fn is_compatible_with(&self, other: &ApiVersion) -> bool {
        self.major == other.major
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Errors related to API versioning.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),
}
