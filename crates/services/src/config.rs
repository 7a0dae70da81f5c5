use chrono::Duration;

pub const DEFAULT_DB_URL: &str = "sqlite://dev.sqlite3";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Settings the binaries resolve from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesConfig {
    pub db_url: String,
    pub session_ttl: Duration,
}

impl ServicesConfig {
    #[must_use]
    pub fn new(db_url: impl Into<String>, session_ttl_secs: i64) -> Self {
        Self {
            db_url: db_url.into(),
            session_ttl: Duration::seconds(session_ttl_secs.max(0)),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_URL, DEFAULT_SESSION_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_local_sqlite_and_one_hour_sessions() {
        let config = ServicesConfig::default();
        assert_eq!(config.db_url, "sqlite://dev.sqlite3");
        assert_eq!(config.session_ttl, Duration::hours(1));
    }

    #[test]
    fn negative_ttl_clamps_to_zero() {
        assert_eq!(ServicesConfig::new("sqlite::memory:", -5).session_ttl, Duration::zero());
    }
}
