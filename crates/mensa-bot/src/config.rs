use std::{net::IpAddr, path::Path};

use tokio::fs;

pub const CONFIG_PATH: &str = "mensa_bot.toml";

pub async fn read() -> anyhow::Result<Config> {
    if let Err(err) = dotenvy::dotenv() {
        tracing::debug!("no .env loaded: {err}");
    }

    let canon = fs::canonicalize(".").await?;
    tracing::info!("try reading config file {CONFIG_PATH} at {canon:?}");

    let mut config = read_file(Path::new(CONFIG_PATH)).await?;
    config.apply_env(|key| std::env::var(key).ok())?;

    tracing::info!("using config: {config:#?}");
    Ok(config)
}

async fn read_file(path: &Path) -> anyhow::Result<Config> {
    if fs::try_exists(path).await? {
        tracing::info!("found config");

        let config = fs::read_to_string(path).await?;
        let config = toml::from_str(&config)?;
        tracing::info!("read config");
        Ok(config)
    } else {
        tracing::info!("config does not exist, using default config");
        Ok(Config::default())
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Secrets, the port and the redis url may come from the environment
    /// instead of the file. Set variables win.
    pub fn apply_env(
        &mut self, var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(url) = var("REDIS_URL") {
            self.cache.redis_url = Some(url);
        }
        if let Some(port) = var("PORT") {
            self.server.port = port.trim().parse()
                .map_err(|err| anyhow::anyhow!("PORT is not a port: {err}"))?;
        }

        let token = var("TELEGRAM_TOKEN");
        let secret = var("WEBHOOK_SECRET");
        let admin = var("ADMIN_CHAT_ID")
            .map(|v| v.trim().parse::<i64>())
            .transpose()
        .map_err(|err| anyhow::anyhow!("ADMIN_CHAT_ID is not a chat id: {err}"))?;

        if let Some(tg) = &mut self.telegram {
            if let Some(token) = token { tg.token = token; }
            if let Some(secret) = secret { tg.webhook_secret = secret; }
            if let Some(admin) = admin { tg.admin_chat_id = Some(admin); }
        } else if let Some(token) = token {
            let Some(webhook_secret) = secret else {
                anyhow::bail!("TELEGRAM_TOKEN is set but WEBHOOK_SECRET is missing");
            };
            self.telegram = Some(TelegramConfig {
                token, webhook_secret,
                admin_chat_id: admin,
                api_base: default_api_base(),
            });
        } else {
            tracing::warn!("no telegram config provided, running without bot");
        }

        Ok(())
    }
}

/// Where the http api and the webhook listen, all interfaces on 3000
/// unless set.
#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::from([0, 0, 0, 0]), port: 3000 }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { base_url: mensa_feed::fetch::DEFAULT_BASE_URL.to_string() }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
    /// cron expression for refreshing the current and next week,
    /// `None` disables the job
    pub warm_schedule: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: mensa_feed::cache::DEFAULT_TTL.as_secs(),
            // every full hour
            warm_schedule: Some("0 0 * * * *".into()),
        }
    }
}

#[derive(serde::Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub webhook_secret: String,
    pub admin_chat_id: Option<i64>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String { "https://api.telegram.org".into() }

// keep the token and secret out of the logs
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("admin_chat_id", &self.admin_chat_id)
            .field("api_base", &self.api_base)
        .finish()
    }
}
