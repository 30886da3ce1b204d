//! Platform capability queries.
//!
//! Gated gateway paths ask a `Capabilities` object instead of branching on
//! the platform version themselves, so tests can flip a gate directly.

use std::fmt;
use std::str::FromStr;

/// Feature gates for the async gateway operations.
pub trait Capabilities: Send + Sync {
    /// Street-level immersive scenes (look-around).
    fn supports_immersive_scenes(&self) -> bool;

    fn supports_snapshots(&self) -> bool {
        true
    }
}

/// A dotted `major.minor` platform version. Patch components are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
}

impl PlatformVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid platform version: {0:?}")]
pub struct VersionParseError(pub String);

impl FromStr for PlatformVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || VersionParseError(s.to_string());
        let mut parts = s.trim().split('.');
        let major = parts.next().filter(|p| !p.is_empty()).ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| bad())?,
            None => 0,
        };
        Ok(Self { major, minor })
    }
}

/// Version-threshold gate: a feature is available when the running platform
/// is at or above its minimum.
#[derive(Debug, Clone, Copy)]
pub struct VersionGate {
    pub platform: PlatformVersion,
    pub immersive_min: PlatformVersion,
    pub snapshot_min: PlatformVersion,
}

impl Capabilities for VersionGate {
    fn supports_immersive_scenes(&self) -> bool {
        self.platform >= self.immersive_min
    }

    fn supports_snapshots(&self) -> bool {
        self.platform >= self.snapshot_min
    }
}

#[cfg(test)]
#[path = "capability_test.rs"]
mod tests;
