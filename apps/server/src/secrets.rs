//! Broker credentials.
//!
//! Each value is read from the JSON secrets file when one is configured, then
//! from the environment. Nothing here is fatal: a missing credential only
//! disables the features that need it.

use std::{collections::HashMap, fmt, fs, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

const WEBHOOK_SECRET: (&str, &str) = ("dhan_secret", "DHAN_SECRET");
const CLIENT_ID: (&str, &str) = ("dhan_client_id", "CLIENT_ID");
const ACCESS_TOKEN: (&str, &str) = ("dhan_access_token", "ACCESS_TOKEN");

#[derive(Deserialize)]
#[serde(untagged)]
enum SecretsFile {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        secrets: HashMap<String, String>,
    },
    Flat(HashMap<String, String>),
}

#[derive(Clone, Default)]
pub struct Credentials {
    pub webhook_secret: Option<String>,
    pub client_id: Option<String>,
    pub access_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };
        f.debug_struct("Credentials")
            .field("webhook_secret", &state(&self.webhook_secret))
            .field("client_id", &state(&self.client_id))
            .field("access_token", &state(&self.access_token))
            .finish()
    }
}

impl Credentials {
    /// Load from `secret_file` (if given) with environment fallback.
    pub fn load(secret_file: Option<&Path>) -> Self {
        let file = secret_file.map(read_secrets_file).unwrap_or_default();
        let credentials = Self::resolve(|name, env| {
            file.get(name)
                .cloned()
                .or_else(|| std::env::var(env).ok())
        });

        info!("Credentials loaded: {:?}", credentials);
        let missing = credentials.missing();
        if !missing.is_empty() {
            warn!("Missing credentials: {}", missing.join(", "));
        }
        credentials
    }

    fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str, &str) -> Option<String>,
    {
        let get = |(name, env): (&str, &str)| lookup(name, env).filter(|v| !v.trim().is_empty());
        Self {
            webhook_secret: get(WEBHOOK_SECRET),
            client_id: get(CLIENT_ID),
            access_token: get(ACCESS_TOKEN),
        }
    }

    /// Secret names that have no value.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (WEBHOOK_SECRET.0, &self.webhook_secret),
            (CLIENT_ID.0, &self.client_id),
            (ACCESS_TOKEN.0, &self.access_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// True when an order client can be built.
    pub fn has_broker_access(&self) -> bool {
        self.client_id.is_some() && self.access_token.is_some()
    }

    /// Compare an alert's secret against the configured one.
    ///
    /// With no configured secret every alert is rejected.
    pub fn verify_webhook_secret(&self, candidate: Option<&str>) -> bool {
        match (&self.webhook_secret, candidate) {
            (Some(expected), Some(candidate)) => expected == candidate,
            _ => false,
        }
    }
}

fn read_secrets_file(path: &Path) -> HashMap<String, String> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Could not read secrets file {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    match serde_json::from_slice::<SecretsFile>(&raw) {
        Ok(SecretsFile::Versioned { secrets, .. }) | Ok(SecretsFile::Flat(secrets)) => secrets,
        Err(e) => {
            warn!("Secrets file {} is not valid: {}", path.display(), e);
            HashMap::new()
        }
    }
}
