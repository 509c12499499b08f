//! Connection pool settings.

use std::time::Duration;

use payflow_core::config::{ConfigError, Lookup, parsed_or, positive_or, required};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// PostgreSQL connection pool settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection string.
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// How long an idle connection is kept before being closed.
    pub idle_timeout: Duration,
    /// Maximum lifetime of any connection.
    pub max_lifetime: Duration,
}

// The URL usually carries credentials.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .finish()
    }
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL`, `DB_MAX_CONNS`, `DB_MIN_CONNS`,
    /// `DB_MAX_CONN_IDLE_TIME_SECS` and `DB_MAX_CONN_LIFETIME_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is unset, and
    /// `ConfigError::Invalid` for unparsable values or when the minimum pool
    /// size exceeds the maximum.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let url = required(lookup, "DATABASE_URL")?;
        let max_connections = parsed_or(lookup, "DB_MAX_CONNS", 10_u32)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNS",
                value: max_connections.to_string(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        let min_connections = parsed_or(lookup, "DB_MIN_CONNS", 0_u32)?;
        if min_connections > max_connections {
            return Err(ConfigError::Invalid {
                key: "DB_MIN_CONNS",
                value: min_connections.to_string(),
                reason: format!("must not exceed DB_MAX_CONNS ({max_connections})"),
            });
        }
        let idle_timeout =
            Duration::from_secs(positive_or(lookup, "DB_MAX_CONN_IDLE_TIME_SECS", 1800)?);
        let max_lifetime =
            Duration::from_secs(positive_or(lookup, "DB_MAX_CONN_LIFETIME_SECS", 3600)?);

        Ok(Self {
            url,
            max_connections,
            min_connections,
            idle_timeout,
            max_lifetime,
        })
    }

    /// Opens the connection pool.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the database cannot be reached.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .idle_timeout(Some(self.idle_timeout))
            .max_lifetime(Some(self.max_lifetime))
            .connect(&self.url)
            .await?;
        info!(
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            "database pool ready"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_url_is_set() {
        // Arrange
        let lookup = lookup_from(&[("DATABASE_URL", "postgres://localhost/payflow")]);

        // Act
        let config = DatabaseConfig::from_lookup(&lookup).unwrap();

        // Assert
        assert_eq!(config.url, "postgres://localhost/payflow");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.idle_timeout, Duration::from_secs(1800));
        assert_eq!(config.max_lifetime, Duration::from_secs(3600));
    }

    #[test]
    fn test_missing_url_is_reported() {
        let lookup = lookup_from(&[]);

        let result = DatabaseConfig::from_lookup(&lookup);

        assert_eq!(result, Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_min_connections_above_max_is_invalid() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/payflow"),
            ("DB_MAX_CONNS", "4"),
            ("DB_MIN_CONNS", "5"),
        ]);

        let result = DatabaseConfig::from_lookup(&lookup);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "DB_MIN_CONNS", .. })
        ));
    }

    #[test]
    fn test_debug_output_hides_url() {
        let lookup = lookup_from(&[("DATABASE_URL", "postgres://user:secret@db/payflow")]);

        let config = DatabaseConfig::from_lookup(&lookup).unwrap();

        assert!(!format!("{config:?}").contains("secret"));
    }
}
