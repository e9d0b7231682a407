use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::models::UserId;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_LOG_FILTER: &str = "attendance_ledger=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// `None` when nobody is signed in.
    pub user: Option<UserId>,
    pub max_connections: u32,
}

impl Config {
    pub fn new(
        database_url: Option<String>,
        user: Option<String>,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        let database_url = database_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .context("DATABASE_URL must be set to a production Postgres instance")?;
        if max_connections == 0 {
            anyhow::bail!("max connections must be at least 1");
        }
        Ok(Config {
            database_url,
            user: user.and_then(UserId::new),
            max_connections,
        })
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .context("failed to connect to Postgres")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_is_required() {
        assert!(Config::new(None, Some("uid".into()), 5).is_err());
        assert!(Config::new(Some("  ".into()), Some("uid".into()), 5).is_err());
    }

    #[test]
    fn blank_users_mean_signed_out() {
        let config = Config::new(Some("postgres://localhost/ledger".into()), Some(" ".into()), 5)
            .unwrap();
        assert!(config.user.is_none());

        let config = Config::new(Some("postgres://localhost/ledger".into()), Some("uid-7".into()), 5)
            .unwrap();
        assert_eq!(config.user.unwrap().as_str(), "uid-7");
    }

    #[test]
    fn pool_needs_a_connection() {
        assert!(Config::new(Some("postgres://localhost/ledger".into()), None, 0).is_err());
    }
}
