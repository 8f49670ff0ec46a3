//! # Environment Reader
//!
//! Typed access to environment variables. Reads go through [`Env`] so tests can
//! supply a fixed set of variables instead of touching the process environment.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single problem with one environment variable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("{name} is not set")]
    Missing { name: String },

    #[error("{name} is not parsable: {value:?}")]
    NotParsable { name: String, value: String },
}

impl EnvError {
    /// Name of the offending variable
    pub fn name(&self) -> &str {
        match self {
            EnvError::Missing { name } | EnvError::NotParsable { name, .. } => name,
        }
    }
}

/// Deployment profile, from `APP_ENV`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEnv {
    Test,
    Dev,
    Stg,
    Prd,
    /// Unrecognised value, kept verbatim and treated as non-cloud
    Other(String),
}

impl AppEnv {
    pub fn parse(value: &str) -> Self {
        match value {
            "test" => AppEnv::Test,
            "dev" => AppEnv::Dev,
            "stg" => AppEnv::Stg,
            "prd" => AppEnv::Prd,
            other => AppEnv::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AppEnv::Test => "test",
            AppEnv::Dev => "dev",
            AppEnv::Stg => "stg",
            AppEnv::Prd => "prd",
            AppEnv::Other(value) => value,
        }
    }

    pub fn is_test(&self) -> bool {
        *self == AppEnv::Test
    }

    pub fn is_dev(&self) -> bool {
        *self == AppEnv::Dev
    }

    pub fn is_stg(&self) -> bool {
        *self == AppEnv::Stg
    }

    pub fn is_prd(&self) -> bool {
        *self == AppEnv::Prd
    }

    /// Deployed profiles: `dev`, `stg` and `prd`
    pub fn is_cloud(&self) -> bool {
        self.is_dev() || self.is_stg() || self.is_prd()
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Source {
    Process,
    Fixed(HashMap<String, String>),
}

/// Source of environment variables
#[derive(Debug, Clone)]
pub struct Env {
    source: Source,
}

impl Env {
    /// Reads the process environment
    pub fn process() -> Self {
        Self {
            source: Source::Process,
        }
    }

    /// Fixed set of variables
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: Source::Fixed(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.source {
            Source::Process => std::env::var(name).ok(),
            Source::Fixed(vars) => vars.get(name).cloned(),
        }
    }

    /// Required string; empty counts as missing
    ///
    /// # Errors
    ///
    /// [`EnvError::Missing`] when the variable is unset or empty.
    pub fn string(&self, name: &str) -> Result<String, EnvError> {
        self.lookup(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| EnvError::Missing {
                name: name.to_string(),
            })
    }

    /// Required integer
    ///
    /// # Errors
    ///
    /// [`EnvError::Missing`] when unset, [`EnvError::NotParsable`] when not an integer.
    pub fn int(&self, name: &str) -> Result<i64, EnvError> {
        let value = self.string(name)?;
        value
            .trim()
            .parse()
            .map_err(|_parse_error| EnvError::NotParsable {
                name: name.to_string(),
                value,
            })
    }

    /// Deployment profile, `fallback` when unset
    pub fn app_env(&self, name: &str, fallback: &str) -> AppEnv {
        match self.string(name) {
            Ok(value) => AppEnv::parse(&value),
            Err(_) => AppEnv::parse(fallback),
        }
    }

    /// Optional string with a default
    pub fn string_or(&self, name: &str, default: &str) -> String {
        self.string(name).unwrap_or_else(|_| default.to_string())
    }

    /// Optional value with a default; unparsable values fall back to the default
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.lookup(name)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// Collects every problem found while reading a group of required variables
#[derive(Debug, Default)]
pub struct EnvReport {
    problems: Vec<EnvError>,
}

impl EnvReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required string; records the problem and yields an empty string on failure
    pub fn string(&mut self, env: &Env, name: &str) -> String {
        env.string(name).unwrap_or_else(|error| {
            self.problems.push(error);
            String::new()
        })
    }

    /// Required integer; records the problem and yields zero on failure
    pub fn int(&mut self, env: &Env, name: &str) -> i64 {
        env.int(name).unwrap_or_else(|error| {
            self.problems.push(error);
            0
        })
    }

    /// Check an already read value; records [`EnvError::NotParsable`] when `parse` rejects it
    pub fn validate<T, E>(
        &mut self,
        name: &str,
        value: &str,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> Option<T> {
        match parse(value) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.problems.push(EnvError::NotParsable {
                    name: name.to_string(),
                    value: value.to_string(),
                });
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn problems(&self) -> &[EnvError] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<EnvError> {
        self.problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_treats_empty_as_missing() {
        let env = Env::from_pairs([("A", "value"), ("EMPTY", "")]);
        assert_eq!(env.string("A").unwrap(), "value");
        assert_eq!(
            env.string("EMPTY"),
            Err(EnvError::Missing {
                name: "EMPTY".into()
            })
        );
        assert_eq!(env.string("NOPE").unwrap_err().name(), "NOPE");
    }

    #[test]
    fn test_int() {
        let env = Env::from_pairs([("N", " 42 "), ("BAD", "forty")]);
        assert_eq!(env.int("N").unwrap(), 42);
        assert_eq!(
            env.int("BAD"),
            Err(EnvError::NotParsable {
                name: "BAD".into(),
                value: "forty".into()
            })
        );
        assert!(matches!(env.int("NOPE"), Err(EnvError::Missing { .. })));
    }

    #[test]
    fn test_app_env_fallback() {
        let env = Env::from_pairs([("APP_ENV", "stg")]);
        assert_eq!(env.app_env("APP_ENV", "test"), AppEnv::Stg);

        let env = Env::from_pairs(Vec::<(String, String)>::new());
        assert_eq!(env.app_env("APP_ENV", "test"), AppEnv::Test);
    }

    #[test]
    fn test_app_env_classification() {
        assert!(AppEnv::Dev.is_cloud());
        assert!(AppEnv::Stg.is_cloud());
        assert!(AppEnv::Prd.is_cloud());
        assert!(!AppEnv::Test.is_cloud());

        let other = AppEnv::parse("qa");
        assert_eq!(other, AppEnv::Other("qa".into()));
        assert!(!other.is_cloud());
        assert_eq!(other.to_string(), "qa");
    }

    #[test]
    fn test_defaults() {
        let env = Env::from_pairs([("PORT", "nope"), ("GRACE", "7")]);
        assert_eq!(env.parse_or("PORT", 8080u16), 8080);
        assert_eq!(env.parse_or("GRACE", 3u64), 7);
        assert_eq!(env.string_or("HOST", "0.0.0.0"), "0.0.0.0");
    }

    #[test]
    fn test_report_collects_every_problem() {
        let env = Env::from_pairs([("URI", "mongodb://db"), ("COUNT", "x")]);
        let mut report = EnvReport::new();

        assert_eq!(report.string(&env, "URI"), "mongodb://db");
        assert_eq!(report.string(&env, "USER"), "");
        assert_eq!(report.int(&env, "COUNT"), 0);
        assert_eq!(report.string(&env, "PASSWORD"), "");

        let names: Vec<&str> = report.problems().iter().map(EnvError::name).collect();
        assert_eq!(names, ["USER", "COUNT", "PASSWORD"]);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_report_validates_read_values() {
        let mut report = EnvReport::new();

        assert_eq!(report.validate("RATIO", "0.5", str::parse::<f64>), Some(0.5));
        assert!(report.is_empty());

        assert_eq!(report.validate("RATIO", "half", str::parse::<f64>), None);
        assert_eq!(
            report.problems(),
            [EnvError::NotParsable {
                name: "RATIO".into(),
                value: "half".into()
            }]
        );
    }
}
