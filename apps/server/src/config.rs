use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use dhanbridge_symbols::{ProvisionPolicy, RemoteLookupConfig};

pub const DEFAULT_DATASET_PATH: &str = "./security_id_list.csv";
pub const DEFAULT_DHAN_API_BASE_URL: &str = "https://api.dhan.co";
pub const DEFAULT_SCRIP_MASTER_URL: &str = "https://images.dhan.co/api-data/api-scrip-master.csv";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub dataset_path: PathBuf,
    pub download_url: Option<String>,
    pub max_age_hours: Option<u64>,
    pub dhan_api_base_url: String,
    pub scrip_master_url: String,
    pub lookup_timeout: Duration,
    pub static_fallback: bool,
    pub secret_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_vars<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let listen_addr: SocketAddr = match var("BRIDGE_LISTEN_ADDR") {
            Some(addr) => addr,
            None => format!(
                "{}:{}",
                var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
                var("PORT").unwrap_or_else(|| "8000".into())
            ),
        }
        .parse()
        .context("Invalid BRIDGE_LISTEN_ADDR (or HOST/PORT)")?;

        let cors_allow = var("BRIDGE_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let millis = |key: &str| -> u64 {
            var(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(30000)
        };

        let max_age_hours = match var("CSV_MAX_AGE_HOURS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid CSV_MAX_AGE_HOURS: {}", raw))?,
            ),
            None => None,
        };

        let static_fallback = !matches!(
            var("STATIC_FALLBACK")
                .map(|v| v.trim().to_ascii_lowercase())
                .as_deref(),
            Some("off" | "false" | "0" | "no")
        );

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(millis("BRIDGE_REQUEST_TIMEOUT_MS")),
            dataset_path: var("SECURITY_CSV_PATH")
                .unwrap_or_else(|| DEFAULT_DATASET_PATH.into())
                .into(),
            download_url: var("CSV_DOWNLOAD_URL"),
            max_age_hours,
            dhan_api_base_url: var("DHAN_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DHAN_API_BASE_URL.into()),
            scrip_master_url: var("DHAN_SCRIP_MASTER_URL")
                .unwrap_or_else(|| DEFAULT_SCRIP_MASTER_URL.into()),
            lookup_timeout: Duration::from_millis(millis("DHAN_LOOKUP_TIMEOUT_MS")),
            static_fallback,
            secret_file: var("BRIDGE_SECRET_FILE").map(PathBuf::from),
        })
    }

    pub fn provision_policy(&self) -> ProvisionPolicy {
        match self.max_age_hours {
            Some(hours) => ProvisionPolicy::expiring_hours(hours),
            None => ProvisionPolicy::PresenceOnly,
        }
    }

    pub fn remote_lookup(&self) -> RemoteLookupConfig {
        RemoteLookupConfig {
            timeout: self.lookup_timeout,
        }
    }
}
