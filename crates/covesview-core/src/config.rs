use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub hostname: String,
    pub port: u16,
    pub public_url: String,

    pub database: DatabaseConfig,

    /// did:web / did:plc of this AppView instance, used as the audience
    /// when minting service-auth tokens for data-server requests.
    pub instance_did: String,
    pub instance_domain: String,

    pub identity: IdentityConfig,
    pub firehose: FirehoseConfig,
    pub session: SessionConfig,
    pub image_proxy: ImageProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub plc_directory_url: String,
    #[serde(default = "default_identity_cache_ttl_secs")]
    pub cache_ttl_secs: i64,
}

fn default_identity_cache_ttl_secs() -> i64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirehoseConfig {
    pub relay_url: String,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
}

fn default_backoff_cap_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret used to sign the short-lived HS256 JWTs that authenticate
    /// requests to this AppView's own RPC surface.
    pub jwt_secret: String,
    /// Separate secret used to derive the HMAC tag on opaque pagination
    /// cursors, so a leaked JWT secret can't be used to forge cursors.
    pub cursor_secret: String,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
}

fn default_session_ttl_secs() -> i64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageProxyConfig {
    pub cache_path: String,
    #[serde(default = "default_image_cache_max_bytes")]
    pub cache_max_bytes: u64,
}

fn default_image_cache_max_bytes() -> u64 {
    1_000_000_000
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("COVESVIEW_").split("__"))
            .extract()
    }
}
