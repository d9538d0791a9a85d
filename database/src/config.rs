use std::str::FromStr;

use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

impl DatabaseConfig {
    pub fn from_cli_or_env_or_yaml(cli_arg: Option<String>, yaml_config: Option<String>) -> Self {
        let url = if let Some(arg) = cli_arg {
            arg
        } else if let Ok(env) = std::env::var("DATABASE_URL") {
            env
        } else if let Some(yaml) = yaml_config {
            yaml
        } else {
            MEMORY_URL.to_string()
        };

        Self { url, pool_size: 20 }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }

    pub async fn create_pool(&self) -> Result<sqlx::SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&self.url)?.create_if_missing(true);
        // every connection to :memory: opens its own empty database
        let max_connections = if self.is_in_memory() {
            1
        } else {
            self.pool_size
        };
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let config = DatabaseConfig::from_cli_or_env_or_yaml(
            Some("sqlite://cli.db".to_string()),
            Some("sqlite://yaml.db".to_string()),
        );
        assert_eq!(config.url, "sqlite://cli.db");
        assert!(!config.is_in_memory());
    }

    #[tokio::test]
    async fn test_in_memory_pool() {
        let config = DatabaseConfig {
            url: MEMORY_URL.to_string(),
            pool_size: 20,
        };
        let pool = config.create_pool().await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);
    }
}
