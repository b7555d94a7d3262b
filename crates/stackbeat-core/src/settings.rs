//! Runtime settings resolution.
//!
//! Settings arrive as loosely-typed strings from several layers (command
//! line / environment, legacy environment names, an optional TOML file).
//! [`RawSettings`] holds one layer; layers are merged with
//! [`RawSettings::or`] and turned into an immutable [`Settings`] by
//! [`RawSettings::resolve`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{SettingsError, SettingsResult};
use crate::ignore::IgnoreSet;

/// Poll interval used when none (or a non-positive one) is configured.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Failures are reported from the first failing cycle by default.
pub const DEFAULT_ERROR_THRESHOLD: i64 = 0;

/// Upper bound for any single inventory or notification call.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Path segment appended to the ping URL for failure pings.
const FAIL_SUFFIX: &str = "/fail";

/// Legacy environment variable names, consulted after the primary ones.
pub const LEGACY_PROJECT_VAR: &str = "COMPOSE_PROJECT_NAME";
pub const LEGACY_INTERVAL_VAR: &str = "INTERVAL";
pub const LEGACY_PING_URL_VAR: &str = "HEALTHCHECK_PING_URL";

// ── Resolved ───────────────────────────────────────────────────────

/// Success and failure URLs derived from one configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingTargets {
    pub success: String,
    pub failure: String,
}

impl PingTargets {
    /// Success pings go to `base` untouched; failures go to `base` with
    /// trailing slashes stripped and `/fail` appended.
    pub fn from_base(base: &str) -> Self {
        Self {
            success: base.to_string(),
            failure: format!("{}{FAIL_SUFFIX}", base.trim_end_matches('/')),
        }
    }
}

/// Immutable configuration for one agent process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Compose project whose containers are watched.
    pub project: String,
    pub interval: Duration,
    pub targets: PingTargets,
    pub ignore: IgnoreSet,
    /// Consecutive failing cycles required before a failure ping is sent.
    pub error_threshold: i64,
}

// ── Raw layers ─────────────────────────────────────────────────────

/// One layer of unvalidated settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    pub project: Option<String>,
    pub interval: Option<String>,
    pub ping_url: Option<String>,
    pub ignore: Option<String>,
    pub error_threshold: Option<String>,
}

/// TOML file shape. Numbers may be written as numbers or strings and the
/// ignore list as a string or an array.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    project: Option<String>,
    interval: Option<Scalar>,
    ping_url: Option<String>,
    ignore: Option<IgnoreValue>,
    error_threshold: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgnoreValue {
    List(Vec<String>),
    Joined(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

impl IgnoreValue {
    fn into_string(self) -> String {
        match self {
            IgnoreValue::List(names) => names.join(","),
            IgnoreValue::Joined(s) => s,
        }
    }
}

impl RawSettings {
    /// Layer built from the legacy variable names.
    pub fn from_legacy_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            project: lookup(LEGACY_PROJECT_VAR),
            interval: lookup(LEGACY_INTERVAL_VAR),
            ping_url: lookup(LEGACY_PING_URL_VAR),
            ignore: None,
            error_threshold: None,
        }
    }

    /// Layer read from a TOML config file.
    pub fn from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|reason| SettingsError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        let file: FileSettings = toml::from_str(content).map_err(|e| e.to_string())?;
        Ok(Self {
            project: file.project,
            interval: file.interval.map(Scalar::into_string),
            ping_url: file.ping_url,
            ignore: file.ignore.map(IgnoreValue::into_string),
            error_threshold: file.error_threshold.map(Scalar::into_string),
        })
    }

    /// Field-wise merge: values present in `self` win, blanks fall through
    /// to `fallback`.
    pub fn or(self, fallback: RawSettings) -> Self {
        Self {
            project: present(self.project).or(present(fallback.project)),
            interval: present(self.interval).or(present(fallback.interval)),
            ping_url: present(self.ping_url).or(present(fallback.ping_url)),
            ignore: present(self.ignore).or(present(fallback.ignore)),
            error_threshold: present(self.error_threshold).or(present(fallback.error_threshold)),
        }
    }

    /// Validate and apply defaults.
    ///
    /// Bad numbers fall back to their defaults with a warning. A missing
    /// project or ping URL is an error.
    pub fn resolve(self) -> SettingsResult<Settings> {
        let project = present(self.project).ok_or(SettingsError::Missing("project"))?;
        let ping_url = present(self.ping_url).ok_or(SettingsError::Missing("ping_url"))?;

        Ok(Settings {
            project: project.trim().to_string(),
            interval: parse_interval(self.interval.as_deref()),
            targets: PingTargets::from_base(ping_url.trim()),
            ignore: IgnoreSet::parse(self.ignore.as_deref().unwrap_or_default()),
            error_threshold: parse_threshold(self.error_threshold.as_deref()),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_interval(value: Option<&str>) -> Duration {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Duration::from_secs(DEFAULT_INTERVAL_SECS);
    };
    match value.parse::<i64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs as u64),
        Ok(secs) => {
            warn!(
                interval = secs,
                default = DEFAULT_INTERVAL_SECS,
                "non-positive poll interval, using default"
            );
            Duration::from_secs(DEFAULT_INTERVAL_SECS)
        }
        Err(e) => {
            warn!(
                interval = %value,
                error = %e,
                default = DEFAULT_INTERVAL_SECS,
                "invalid poll interval, using default"
            );
            Duration::from_secs(DEFAULT_INTERVAL_SECS)
        }
    }
}

fn parse_threshold(value: Option<&str>) -> i64 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_ERROR_THRESHOLD;
    };
    value.parse::<i64>().unwrap_or_else(|e| {
        warn!(
            error_threshold = %value,
            error = %e,
            default = DEFAULT_ERROR_THRESHOLD,
            "invalid error threshold, using default"
        );
        DEFAULT_ERROR_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn base() -> RawSettings {
        RawSettings {
            project: Some("shop".to_string()),
            ping_url: Some("https://hc-ping.com/abc/".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_applied() {
        let settings = base().resolve().unwrap();
        assert_eq!(settings.project, "shop");
        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(settings.error_threshold, 0);
        assert!(settings.ignore.is_empty());
    }

    #[test]
    fn failure_target_strips_trailing_slashes() {
        let targets = PingTargets::from_base("https://hc-ping.com/abc//");
        assert_eq!(targets.success, "https://hc-ping.com/abc//");
        assert_eq!(targets.failure, "https://hc-ping.com/abc/fail");

        let targets = PingTargets::from_base("https://hc-ping.com/abc");
        assert_eq!(targets.failure, "https://hc-ping.com/abc/fail");
    }

    #[test]
    fn interval_falls_back_on_bad_values() {
        for bad in ["0", "-5", "soon", "1.5"] {
            let raw = RawSettings {
                interval: Some(bad.to_string()),
                ..base()
            };
            assert_eq!(raw.resolve().unwrap().interval, Duration::from_secs(60), "{bad}");
        }

        let raw = RawSettings {
            interval: Some(" 15 ".to_string()),
            ..base()
        };
        assert_eq!(raw.resolve().unwrap().interval, Duration::from_secs(15));
    }

    #[test]
    fn threshold_parses_negative_and_falls_back_on_garbage() {
        let raw = RawSettings {
            error_threshold: Some("-2".to_string()),
            ..base()
        };
        assert_eq!(raw.resolve().unwrap().error_threshold, -2);

        let raw = RawSettings {
            error_threshold: Some("three".to_string()),
            ..base()
        };
        assert_eq!(raw.resolve().unwrap().error_threshold, 0);
    }

    #[test]
    fn missing_required_settings() {
        let raw = RawSettings {
            project: Some("  ".to_string()),
            ..base()
        };
        assert!(matches!(raw.resolve(), Err(SettingsError::Missing("project"))));

        let raw = RawSettings {
            ping_url: None,
            ..base()
        };
        assert!(matches!(raw.resolve(), Err(SettingsError::Missing("ping_url"))));
    }

    #[test]
    fn primary_layer_wins_and_blanks_fall_through() {
        let primary = RawSettings {
            project: Some("".to_string()),
            interval: Some("30".to_string()),
            ..Default::default()
        };
        let env: HashMap<&str, &str> = HashMap::from([
            ("COMPOSE_PROJECT_NAME", "legacy"),
            ("INTERVAL", "90"),
            ("HEALTHCHECK_PING_URL", "https://example.com/ping"),
        ]);
        let legacy = RawSettings::from_legacy_env(|k| env.get(k).map(|v| v.to_string()));

        let settings = primary.or(legacy).resolve().unwrap();
        assert_eq!(settings.project, "legacy");
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.targets.success, "https://example.com/ping");
    }

    #[test]
    fn toml_file_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
project = "shop"
ping_url = "https://hc-ping.com/xyz"
interval = 20
ignore = ["backup", "cron"]
error_threshold = "3"
"#
        )
        .unwrap();

        let settings = RawSettings::from_file(file.path())
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(settings.interval, Duration::from_secs(20));
        assert_eq!(settings.error_threshold, 3);
        assert!(settings.ignore.contains("backup"));
        assert!(settings.ignore.contains("cron"));
        assert_eq!(settings.targets.failure, "https://hc-ping.com/xyz/fail");
    }

    #[test]
    fn toml_ignore_as_string() {
        let raw = RawSettings::from_toml_str(r#"ignore = "a; b""#).unwrap();
        assert_eq!(raw.ignore.as_deref(), Some("a; b"));
    }

    #[test]
    fn toml_unknown_key_rejected() {
        assert!(RawSettings::from_toml_str("colour = \"blue\"").is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = RawSettings::from_file(Path::new("/nonexistent/stackbeat.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
