use anyhow::Result;
use serde::Deserialize;
use std::fs::{self};

const DEFAULT_CONFIG_FILE: &str = "mail_digest.toml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Deserialize, Debug)]
pub struct Config {
    pub connection: Connection,
    pub tls: Option<TlsOptions>,
    pub summarizer: SummarizerOptions,
}

#[derive(Deserialize, Debug)]
pub struct Connection {
    pub server: String,
    pub address: String,
    pub secret: String,
}

/// TLS policy for the mailbox connection. `insecure_skip_verify` disables
/// certificate and hostname checks on both the implicit-TLS and STARTTLS
/// paths, leaving the connection open to interception. It exists for
/// self-signed or misconfigured mail servers and is never the default.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct TlsOptions {
    #[serde(default)]
    pub insecure_skip_verify: bool,
    pub timeout_secs: Option<u64>,
}

impl TlsOptions {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SummarizerOptions {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

pub fn get_config(file: &Option<String>) -> Result<Config> {
    let s = fs::read_to_string(
        file.as_ref()
            .unwrap_or(&DEFAULT_CONFIG_FILE.to_string()),
    )?;
    let config: Config = toml::from_str(&s)?;
    Ok(config)
}
