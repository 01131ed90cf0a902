use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC signing secret. `None` disables every token operation.
    pub secret: Option<String>,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        if secret.is_none() {
            if env_flag("JWT_SECRET_REQUIRED") {
                anyhow::bail!("JWT_SECRET is required but not set");
            }
            tracing::warn!("JWT_SECRET not set; signup works but login and /todos will fail");
        }

        let jwt = JwtConfig {
            secret,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| *m > 0)
                .unwrap_or(60 * 24),
        };
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
        })
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_accepts_common_truthy_values() {
        std::env::set_var("TODO_AUTH_TEST_FLAG", "TRUE");
        assert!(env_flag("TODO_AUTH_TEST_FLAG"));
        std::env::set_var("TODO_AUTH_TEST_FLAG", "0");
        assert!(!env_flag("TODO_AUTH_TEST_FLAG"));
        std::env::remove_var("TODO_AUTH_TEST_FLAG");
        assert!(!env_flag("TODO_AUTH_TEST_FLAG"));
    }
}
