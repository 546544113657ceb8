use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Seconds allowed for establishing the upstream connection.
    pub connect_timeout: u64,
    /// Overall upstream request timeout in seconds, 0 disables it.
    pub request_timeout: u64,
    pub follow_redirects: bool,
    /// Buffer capacity for rewritten playlists when the origin sends no length.
    pub playlist_buffer_size: usize,
    /// Outbound network proxy for every upstream request (http, https or socks5).
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` when no `proxy_url` is set.
    pub system_proxy: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub proxy: ProxyConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8888)?
            .set_default("server.workers", 4)?
            .set_default("proxy.connect_timeout", 30)?
            .set_default("proxy.request_timeout", 0)?
            .set_default("proxy.follow_redirects", true)?
            .set_default("proxy.playlist_buffer_size", 2048)?
            .set_default("proxy.system_proxy", true)?;

        // Add configuration from file
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            let path = Path::new(&config_path);
            if path.exists() {
                builder = builder.add_source(config::File::with_name(&config_path));
            } else {
                warn!("Config file not found at {}", config_path);
            }
        }

        // Add configuration from environment
        builder = builder.add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
