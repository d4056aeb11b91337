use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::{ops::AddAssign, str::FromStr};
use tracing_subscriber::{filter::Directive, EnvFilter};

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// The minimum level that logs should be reported at.
    ///
    /// Each entry can be one of `ERROR`, `WARN`, `INFO`, `DEBUG`, or `TRACE` (in
    /// increasing verbosity), with an optional component that specifies the
    /// source of the logs.
    ///
    /// The environment variable `WAYFARER_LOGGING__LEVELS` replaces the
    /// configured list. `RUST_LOG` is always added on top, and wins over both.
    ///
    /// # Examples
    ///
    /// The configurations below are identical
    ///
    /// ```yaml
    /// # config/local.yaml
    /// logging:
    ///   levels:
    ///     - INFO                 # default to INFO
    ///     - wayfarer_store=DEBUG # noisier logs from the store
    /// ```
    ///
    /// ```shell
    /// RUST_LOG=INFO,wayfarer_store=DEBUG
    /// ```
    pub levels: LogDirectives,

    /// The format to output logs in.
    pub format: LogFormat,
}

/// The output formats for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// [`tracing-subscriber`]'s human targeted, pretty format. Multiple lines
    /// per log event.
    Pretty,

    /// One JSON object per log event, for log aggregation.
    Json,

    /// [`tracing-subscriber`]'s default format. One line per log event.
    Compact,
}

/// A validated list of `tracing` filter directives.
///
/// Tracing's `Directive` isn't `Clone` or serializable, so the directives are
/// kept as strings. Every entry is guaranteed to parse as a `Directive`.
///
/// Deserializes from either a comma separated string (`"INFO,wayfarer_web=WARN"`)
/// or a sequence of such strings. Config files use sequences, but environment
/// variables are always strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDirectives", into = "Vec<String>")]
pub struct LogDirectives(Vec<String>);

/// The accepted shapes of [`LogDirectives`] before validation.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDirectives {
    /// `"INFO,wayfarer_web=DEBUG"`
    One(String),
    /// `["INFO", "wayfarer_web=DEBUG"]`
    Many(Vec<String>),
}

impl TryFrom<RawDirectives> for LogDirectives {
    type Error = anyhow::Error;

    fn try_from(raw: RawDirectives) -> Result<Self, Self::Error> {
        match raw {
            RawDirectives::One(s) => s.parse(),
            RawDirectives::Many(items) => {
                let mut rv = Self::default();
                for item in items {
                    rv += item.parse()?;
                }
                Ok(rv)
            }
        }
    }
}

impl From<LogDirectives> for Vec<String> {
    fn from(directives: LogDirectives) -> Self {
        directives.0
    }
}

impl FromStr for LogDirectives {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();

        for part in &parts {
            part.parse::<Directive>()
                .with_context(|| format!("invalid log directive {:?}", part))?;
        }

        // Crate names are always written with underscores in targets.
        if let Some(part) = parts.iter().find(|p| p.contains('-')) {
            bail!("log targets must not include hyphens: {:?}", part);
        }

        Ok(Self(parts))
    }
}

impl AddAssign for LogDirectives {
    fn add_assign(&mut self, rhs: Self) {
        self.0.extend(rhs.0)
    }
}

impl LogDirectives {
    /// The directives, in the order they will be applied.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Build an [`EnvFilter`] from these directives, adding any directives from
    /// the `RUST_LOG` environment variable last so they take precedence.
    ///
    /// # Errors
    /// If `RUST_LOG` contains an invalid directive.
    pub fn to_env_filter(&self) -> anyhow::Result<EnvFilter> {
        let mut all = self.clone();
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            all += rust_log.parse().context("parsing RUST_LOG")?;
        }

        let mut filter = EnvFilter::default();
        for directive in &all.0 {
            filter = filter.add_directive(directive.parse()?);
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parameterized::parameterized;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn directives_from_string() {
        let directives: LogDirectives = serde_json::from_value(json!("INFO,wayfarer_web=DEBUG"))
            .expect("should deserialize");
        assert_eq!(directives.as_slice(), ["INFO", "wayfarer_web=DEBUG"]);
    }

    #[test]
    fn directives_from_sequence() {
        let directives: LogDirectives =
            serde_json::from_value(json!(["WARN", "wayfarer_store=TRACE,wayfarer_web=INFO"]))
                .expect("should deserialize");
        assert_eq!(
            directives.as_slice(),
            ["WARN", "wayfarer_store=TRACE", "wayfarer_web=INFO"]
        );
    }

    #[parameterized(input = {
        "wayfarer-web=DEBUG",
        "INFO,wayfarer-store=WARN",
        "wayfarer_web=LOUD",
    })]
    fn invalid_directives_are_rejected(input: &str) {
        assert!(input.parse::<LogDirectives>().is_err());
    }

    #[test]
    fn directives_round_trip_as_list() {
        let directives: LogDirectives = "INFO,wayfarer_web=DEBUG".parse().unwrap();
        assert_eq!(
            serde_json::to_value(&directives).unwrap(),
            json!(["INFO", "wayfarer_web=DEBUG"])
        );
    }
}
