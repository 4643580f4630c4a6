use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use tracing::info;

use crate::roll;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    /// Pins the calendar year used to derive academic years.
    pub reference_year: Option<i32>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .context("DATABASE_URL must be set to a Postgres instance")?;

        let max_connections = parse_optional(&lookup, "DATABASE_MAX_CONNECTIONS")?
            .unwrap_or_else(|| {
                info!("DATABASE_MAX_CONNECTIONS not set, using default: {DEFAULT_MAX_CONNECTIONS}");
                DEFAULT_MAX_CONNECTIONS
            });
        if max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be at least 1"));
        }

        let reference_year = parse_optional(&lookup, "MESS_REFERENCE_YEAR")?;

        Ok(Self {
            database_url,
            max_connections,
            reference_year,
        })
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(roll::current_year)
    }
}

fn parse_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<T>>
where
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn database_url_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn defaults_apply_when_optional_values_are_absent() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/mess")]).unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.reference_year, None);
    }

    #[test]
    fn optional_values_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/mess"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("MESS_REFERENCE_YEAR", "2025"),
        ])
        .unwrap();
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.reference_year(), 2025);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/mess"),
            ("MESS_REFERENCE_YEAR", "next year"),
        ])
        .is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/mess"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ])
        .is_err());
    }
}
