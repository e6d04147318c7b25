use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub session_ttl_days: i64,
    pub min_password_len: usize,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelshelf.db?mode=rwc".to_string());

        let session_ttl_days: i64 =
            std::env::var("SESSION_TTL_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let min_password_len: usize =
            std::env::var("MIN_PASSWORD_LEN").ok().and_then(|s| s.parse().ok()).unwrap_or(6);

        let secure_cookies = std::env::var("SECURE_COOKIES")
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            session_ttl_days,
            min_password_len,
            secure_cookies,
        })
    }

    /// Idle player sessions are dropped after the sign-in lifetime.
    pub fn player_idle_ttl(&self) -> Duration {
        let days = u64::try_from(self.session_ttl_days.max(1)).unwrap_or(1);
        Duration::from_secs(days * 86_400)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: "sqlite::memory:".to_string(),
            session_ttl_days: 30,
            min_password_len: 6,
            secure_cookies: false,
        }
    }
}
