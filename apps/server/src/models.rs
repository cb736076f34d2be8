use chrono::{DateTime, Utc};
use dhanbridge_symbols::{DatasetOrigin, NotFound, ResolutionDiagnostics};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// TradingView alert body.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookAlert {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub strategy: AlertStrategy,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertStrategy {
    #[serde(default)]
    pub action: String,
    /// A JSON number or numeric string.
    #[serde(default)]
    pub abs_qty: Option<Value>,
}

impl WebhookAlert {
    pub fn symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }

    pub fn exchange(&self) -> String {
        non_blank(&self.exchange).unwrap_or("NSE").to_string()
    }

    pub fn instrument(&self) -> String {
        non_blank(&self.instrument).unwrap_or("EQ").to_string()
    }

    pub fn action(&self) -> String {
        self.strategy.action.trim().to_uppercase()
    }

    /// Whole-share quantity; fractional values are truncated.
    pub fn quantity(&self) -> Option<i64> {
        let qty = match self.strategy.abs_qty.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        qty.is_finite().then(|| qty.trunc() as i64)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Key fields of a failed resolution, as reported to the alert sender.
#[derive(Debug, Serialize)]
pub struct NotFoundDetails {
    pub symbol: String,
    pub instrument: String,
    pub exchange: String,
    pub csv_records: usize,
    pub attempts: ResolutionDiagnostics,
}

impl From<NotFound> for NotFoundDetails {
    fn from(miss: NotFound) -> Self {
        Self {
            symbol: miss.symbol,
            instrument: miss.instrument,
            exchange: miss.exchange,
            csv_records: miss.dataset_records,
            attempts: miss.diagnostics,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponseDetails {
    NotFound(NotFoundDetails),
    Message(String),
}

/// Webhook reply. The HTTP status is 200 for every processed alert.
#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ResponseDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl WebhookResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub app_status: &'static str,
    pub dhan_status: &'static str,
    pub dhan_error: Option<String>,
    pub csv_status: &'static str,
    pub csv_source: DatasetOrigin,
    pub csv_records: usize,
    pub csv_error: Option<String>,
    pub csv_loaded_at: DateTime<Utc>,
    pub memory_cache_symbols: usize,
    pub static_fallback_symbols: usize,
    pub remote_lookup: bool,
    pub started_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub features: Vec<&'static str>,
}

/// Body of a manual dataset refresh.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub secret: Option<String>,
}
