//! Runtime configuration.
//!
//! Read from environment variables; command-line flags override whatever is
//! set here.

use lpe_core::Timestamp;
use lpe_rules::AuditTrail;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                var: "LPE_LOG_FORMAT",
                value: s.to_string(),
            }),
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `EnvFilter` directive for log output.
    pub log_filter: String,
    /// Log line format.
    pub log_format: LogFormat,
    /// Maximum audit entries kept per invocation.
    pub audit_capacity: usize,
    /// Fixed evaluation clock. `None` uses the system clock.
    pub now: Option<Timestamp>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            log_format: LogFormat::Text,
            audit_capacity: AuditTrail::DEFAULT_CAPACITY,
            now: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Variables:
    /// - `LPE_LOG` (default: `warn`)
    /// - `LPE_LOG_FORMAT`, `text` or `json` (default: `text`)
    /// - `LPE_AUDIT_CAPACITY` (default: 10000)
    /// - `LPE_NOW`, an RFC 3339 timestamp or `YYYY-MM-DD` (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let log_format = match lookup("LPE_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };
        let audit_capacity = match lookup("LPE_AUDIT_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "LPE_AUDIT_CAPACITY",
                    value: raw,
                })?,
            None => defaults.audit_capacity,
        };
        let now = match lookup("LPE_NOW") {
            Some(raw) => Some(
                Timestamp::parse_flexible(&raw)
                    .map_err(|_| ConfigError::InvalidValue { var: "LPE_NOW", value: raw })?,
            ),
            None => None,
        };
        Ok(Self {
            log_filter: lookup("LPE_LOG").unwrap_or(defaults.log_filter),
            log_format,
            audit_capacity,
            now,
        })
    }

    /// The evaluation clock: `flag` if given, else the configured clock,
    /// else the system clock.
    pub fn clock(&self, flag: Option<Timestamp>) -> Timestamp {
        flag.or(self.now).unwrap_or_else(Timestamp::now)
    }

    /// Install the global tracing subscriber. Logs go to stderr so stdout
    /// stays machine-readable.
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_new(&self.log_filter)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        match self.log_format {
            LogFormat::Text => builder.init(),
            LogFormat::Json => builder.json().init(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.audit_capacity, 10_000);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = Config::from_lookup(lookup(&[
            ("LPE_LOG", "lpe_rules=debug"),
            ("LPE_LOG_FORMAT", "JSON"),
            ("LPE_AUDIT_CAPACITY", "50"),
            ("LPE_NOW", "2026-03-01"),
        ]))
        .unwrap();
        assert_eq!(cfg.log_filter, "lpe_rules=debug");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.audit_capacity, 50);
        assert_eq!(cfg.now.unwrap().to_iso8601(), "2026-03-01T00:00:00Z");
    }

    #[test]
    fn rejects_bad_values() {
        for (var, value) in [
            ("LPE_LOG_FORMAT", "xml"),
            ("LPE_AUDIT_CAPACITY", "-3"),
            ("LPE_NOW", "yesterday"),
        ] {
            let err = Config::from_lookup(lookup(&[(var, value)])).unwrap_err();
            assert!(err.to_string().contains(var), "{err}");
        }
    }

    #[test]
    fn flag_overrides_configured_clock() {
        let configured = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let flag = Timestamp::parse("2030-01-01T00:00:00Z").unwrap();
        let cfg = Config {
            now: Some(configured),
            ..Config::default()
        };
        assert_eq!(cfg.clock(None), configured);
        assert_eq!(cfg.clock(Some(flag)), flag);
    }
}
