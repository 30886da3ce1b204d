//! Bridge configuration parsed from environment variables.

use crate::engine::Viewport;
use crate::frame::ErrorCode;
use crate::gateway::capability::{PlatformVersion, VersionGate};

pub const DEFAULT_PLATFORM_VERSION: PlatformVersion = PlatformVersion::new(17, 0);
pub const DEFAULT_IMMERSIVE_MIN_VERSION: PlatformVersion = PlatformVersion::new(16, 0);
pub const DEFAULT_SNAPSHOT_MIN_VERSION: PlatformVersion = PlatformVersion::new(10, 0);
pub const DEFAULT_EVENT_BUFFER: usize = 256;
pub const DEFAULT_CALL_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG_PARSE"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub view_id: i64,
    pub platform_version: PlatformVersion,
    pub immersive_min_version: PlatformVersion,
    pub snapshot_min_version: PlatformVersion,
    pub event_buffer: usize,
    pub call_buffer: usize,
    pub viewport: Viewport,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            view_id: 0,
            platform_version: DEFAULT_PLATFORM_VERSION,
            immersive_min_version: DEFAULT_IMMERSIVE_MIN_VERSION,
            snapshot_min_version: DEFAULT_SNAPSHOT_MIN_VERSION,
            event_buffer: DEFAULT_EVENT_BUFFER,
            call_buffer: DEFAULT_CALL_BUFFER,
            viewport: Viewport::default(),
        }
    }
}

impl BridgeConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `MAPBRIDGE_VIEW_ID`: default 0
    /// - `MAPBRIDGE_PLATFORM_VERSION`: default `17.0`
    /// - `MAPBRIDGE_IMMERSIVE_MIN_VERSION`: default `16.0`
    /// - `MAPBRIDGE_SNAPSHOT_MIN_VERSION`: default `10.0`
    /// - `MAPBRIDGE_EVENT_BUFFER`: default 256
    /// - `MAPBRIDGE_CALL_BUFFER`: default 64
    /// - `MAPBRIDGE_VIEWPORT`: `WIDTHxHEIGHT` in points, default `390x844`
    /// - `MAPBRIDGE_SCALE`: pixels per point, default 3
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first malformed variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let viewport = match lookup("MAPBRIDGE_VIEWPORT") {
            Some(raw) => parse_viewport(&raw)
                .ok_or(ConfigError::Invalid { var: "MAPBRIDGE_VIEWPORT", value: raw })?,
            None => defaults.viewport,
        };
        let scale: f64 = env_parse(&lookup, "MAPBRIDGE_SCALE", defaults.viewport.scale)?;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ConfigError::Invalid { var: "MAPBRIDGE_SCALE", value: scale.to_string() });
        }

        Ok(Self {
            view_id: env_parse(&lookup, "MAPBRIDGE_VIEW_ID", defaults.view_id)?,
            platform_version: env_parse(&lookup, "MAPBRIDGE_PLATFORM_VERSION", defaults.platform_version)?,
            immersive_min_version: env_parse(
                &lookup,
                "MAPBRIDGE_IMMERSIVE_MIN_VERSION",
                defaults.immersive_min_version,
            )?,
            snapshot_min_version: env_parse(
                &lookup,
                "MAPBRIDGE_SNAPSHOT_MIN_VERSION",
                defaults.snapshot_min_version,
            )?,
            event_buffer: env_parse(&lookup, "MAPBRIDGE_EVENT_BUFFER", defaults.event_buffer)?.max(1),
            call_buffer: env_parse(&lookup, "MAPBRIDGE_CALL_BUFFER", defaults.call_buffer)?.max(1),
            viewport: Viewport { scale, ..viewport },
        })
    }

    /// The version-threshold capability gate for this platform.
    #[must_use]
    pub fn capabilities(&self) -> VersionGate {
        VersionGate {
            platform: self.platform_version,
            immersive_min: self.immersive_min_version,
            snapshot_min: self.snapshot_min_version,
        }
    }
}

/// Parse `key` if set. Unset means `default`; set but unparseable is an error.
fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var: key, value: raw }),
        None => Ok(default),
    }
}

fn parse_viewport(raw: &str) -> Option<Viewport> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let width: f64 = w.trim().parse().ok()?;
    let height: f64 = h.trim().parse().ok()?;
    (width > 0.0 && height > 0.0).then_some(Viewport { width, height, scale: 1.0 })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
