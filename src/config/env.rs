use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment-variable reader behind the configuration structs.
///
/// Lookups take a spec of the form `NAME` or `NAME:DEFAULT`. A variable that
/// is unset with no default fails with [`Error::MissingVar`] at construction
/// time, intentionally: configuration holes surface at startup, not when the
/// value is first used.
///
/// A handful of sentinel strings are mapped before any conversion, so
/// defaults and deployment overrides can express non-string values:
/// `__NONE__` (absent), `__EMPTY__` (empty string), `__TRUE__` / `__FALSE__`
/// (booleans).
pub struct EnvReader {
    cfg: config::Config,
}

enum Resolved {
    None,
    Bool(bool),
    Text(String),
}

impl EnvReader {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        Ok(Self { cfg })
    }

    /// Required string value.
    pub fn get(&self, spec: &str) -> Result<String> {
        let (name, resolved) = self.resolve(spec)?;
        match resolved {
            Resolved::Text(value) => Ok(value),
            Resolved::Bool(_) | Resolved::None => Err(Error::InvalidVar {
                key: name,
                detail: "expected a string value".to_string(),
            }),
        }
    }

    /// Optional string value; `__NONE__` reads as absent.
    pub fn get_opt(&self, spec: &str) -> Result<Option<String>> {
        let (name, resolved) = self.resolve(spec)?;
        match resolved {
            Resolved::None => Ok(None),
            Resolved::Text(value) => Ok(Some(value)),
            Resolved::Bool(_) => Err(Error::InvalidVar {
                key: name,
                detail: "expected a string value".to_string(),
            }),
        }
    }

    /// Boolean value: the sentinels, or `true`/`false`/`1`/`0`.
    pub fn get_bool(&self, spec: &str) -> Result<bool> {
        let (name, resolved) = self.resolve(spec)?;
        match resolved {
            Resolved::Bool(value) => Ok(value),
            Resolved::Text(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(Error::InvalidVar {
                    key: name,
                    detail: format!("not a boolean: {}", value),
                }),
            },
            Resolved::None => Err(Error::InvalidVar {
                key: name,
                detail: "expected a boolean value".to_string(),
            }),
        }
    }

    /// Value converted through `FromStr`.
    pub fn get_parse<T>(&self, spec: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let (name, resolved) = self.resolve(spec)?;
        match resolved {
            Resolved::Text(value) => value.parse().map_err(|e: T::Err| Error::InvalidVar {
                key: name,
                detail: e.to_string(),
            }),
            Resolved::Bool(_) | Resolved::None => Err(Error::InvalidVar {
                key: name,
                detail: "expected a convertible value".to_string(),
            }),
        }
    }

    fn resolve(&self, spec: &str) -> Result<(String, Resolved)> {
        let (name, default) = match spec.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (spec, None),
        };

        let value = match self.cfg.get_string(name) {
            Ok(value) => value,
            Err(_) => match default {
                // An empty default counts as no default, like `NAME` alone.
                Some(default) if !default.is_empty() => default.to_string(),
                _ => return Err(Error::MissingVar(name.to_string())),
            },
        };

        let resolved = match value.as_str() {
            "__NONE__" => Resolved::None,
            "__EMPTY__" => Resolved::Text(String::new()),
            "__TRUE__" => Resolved::Bool(true),
            "__FALSE__" => Resolved::Bool(false),
            _ => Resolved::Text(value),
        };

        Ok((name.to_string(), resolved))
    }
}
