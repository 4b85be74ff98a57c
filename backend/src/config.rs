use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub cors_origins: Vec<String>,
    /// Seconds between notification poll rounds once push delivery is lost.
    pub notify_poll_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            notify_poll_secs: std::env::var("NOTIFY_POLL_SECS")
                .unwrap_or_else(|_| "25".into())
                .parse()
                .context("NOTIFY_POLL_SECS must be a number")?,
        })
    }
}
