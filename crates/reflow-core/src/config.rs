//! Configuration (A3): `figment`-backed TOML + environment configuration,
//! matching the teacher's `Config::new()`.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::time::LocalTime;
use crate::timezone::validate_timezone;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reflow: ReflowConfig,
}

/// Defaults consumed by domain computation (C4) and the façade's lookahead
/// window, overridable via `config.toml` or `REFLOW_`-prefixed env vars.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    /// Default waking window for flexible instances with no explicit `timeWindow`.
    pub waking_window_start: String,
    pub waking_window_end: String,
    /// Default ideal time assigned to a flexible instance with no pattern `time`.
    pub default_flexible_time: String,
    /// Default reflow lookahead window, in days, when the caller does not
    /// specify an explicit `windowEnd`.
    pub lookahead_days: u32,
    /// The user's default IANA timezone, used by the façade's A4 boundary.
    pub default_timezone: String,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            waking_window_start: "07:00:00".to_string(),
            waking_window_end: "23:00:00".to_string(),
            default_flexible_time: "09:00:00".to_string(),
            lookahead_days: 30,
            default_timezone: detect_system_timezone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { reflow: ReflowConfig::default() }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new().merge(Toml::file("config.toml")).merge(Env::prefixed("REFLOW_")).extract()
    }
}

impl ReflowConfig {
    pub fn waking_window(&self) -> Result<(LocalTime, LocalTime), crate::error::CoreError> {
        let start = self
            .waking_window_start
            .parse()
            .map_err(|e| crate::error::CoreError::InvalidData(format!("waking_window_start: {e}")))?;
        let end = self
            .waking_window_end
            .parse()
            .map_err(|e| crate::error::CoreError::InvalidData(format!("waking_window_end: {e}")))?;
        Ok((start, end))
    }

    pub fn default_flexible_time(&self) -> Result<LocalTime, crate::error::CoreError> {
        self.default_flexible_time
            .parse()
            .map_err(|e| crate::error::CoreError::InvalidData(format!("default_flexible_time: {e}")))
    }
}

/// Detects the system's IANA timezone, falling back through `TZ` →
/// `/etc/timezone` → the `iana-time-zone` crate → `"UTC"`, matching the
/// teacher's `detect_system_timezone`.
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if validate_timezone(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_waking_window_matches_the_core_constant() {
        let cfg = ReflowConfig::default();
        let (start, end) = cfg.waking_window().unwrap();
        assert_eq!(start, LocalTime::new(7, 0, 0).unwrap());
        assert_eq!(end, LocalTime::new(23, 0, 0).unwrap());
    }

    #[test]
    fn detect_system_timezone_never_panics_and_is_valid() {
        let tz = detect_system_timezone();
        assert!(validate_timezone(&tz).is_ok());
    }
}
