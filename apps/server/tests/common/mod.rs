#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use dhanbridge_server::{
    api::app_router,
    broker::{OrderAck, OrderError, OrderGateway, OrderRequest},
    build_state_with,
    config::Config,
    secrets::Credentials,
    AppState, Collaborators,
};
use dhanbridge_symbols::{
    remote::CatalogRow, CatalogPayload, DatasetDownloader, InstrumentCatalog, SymbolError,
};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "s3cret";
pub const HEADER: &str = "SEM_EXM_EXCH_ID,SEM_TRADING_SYMBOL,SEM_SERIES,SEM_SMST_SECURITY_ID\n";

pub struct FakeCatalog(pub Vec<CatalogRow>);

impl FakeCatalog {
    pub fn listing(rows: &[(&str, &str, &str, &str)]) -> Arc<Self> {
        Arc::new(Self(
            rows.iter()
                .map(|(exchange, symbol, series, id)| CatalogRow {
                    exchange: exchange.to_string(),
                    trading_symbol: symbol.to_string(),
                    series: series.to_string(),
                    security_id: id.to_string(),
                })
                .collect(),
        ))
    }
}

#[async_trait]
impl InstrumentCatalog for FakeCatalog {
    fn id(&self) -> &'static str {
        "FAKE"
    }

    async fn fetch_catalog(&self) -> dhanbridge_symbols::Result<CatalogPayload> {
        Ok(CatalogPayload::Rows(self.0.clone()))
    }
}

/// Serves a fixed body, or fails when none is set.
pub struct FakeDownloader(pub Option<String>);

#[async_trait]
impl DatasetDownloader for FakeDownloader {
    async fn download(&self, url: &str) -> dhanbridge_symbols::Result<Vec<u8>> {
        match &self.0 {
            Some(body) => Ok(body.clone().into_bytes()),
            None => Err(SymbolError::Download {
                url: url.to_string(),
                message: "HTTP error: 503 Service Unavailable".to_string(),
            }),
        }
    }
}

/// Records orders; accepts them unless `reject_with` is set.
#[derive(Default)]
pub struct FakeOrders {
    pub placed: Mutex<Vec<OrderRequest>>,
    pub reject_with: Option<String>,
}

impl FakeOrders {
    pub fn placed(&self) -> Vec<OrderRequest> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderGateway for FakeOrders {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
        self.placed.lock().unwrap().push(order.clone());
        match &self.reject_with {
            Some(body) => Err(OrderError::Rejected {
                status: 400,
                body: body.clone(),
            }),
            None => Ok(OrderAck {
                order_id: format!("ORD-{}", order.security_id),
                order_status: Some("PENDING".to_string()),
            }),
        }
    }
}

pub fn config(dataset: &Path, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(
        "SECURITY_CSV_PATH".to_string(),
        dataset.to_string_lossy().to_string(),
    );
    vars.insert("STATIC_FALLBACK".to_string(), "off".to_string());
    vars.insert(
        "CSV_DOWNLOAD_URL".to_string(),
        "https://example.invalid/master.csv".to_string(),
    );
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_vars(|key| vars.get(key).cloned()).unwrap()
}

pub fn credentials() -> Credentials {
    Credentials {
        webhook_secret: Some(SECRET.to_string()),
        client_id: Some("1100000000".to_string()),
        access_token: Some("token".to_string()),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub async fn build_app(
    config: &Config,
    credentials: Credentials,
    catalog: Option<Arc<FakeCatalog>>,
    downloader: FakeDownloader,
    orders: Option<Arc<FakeOrders>>,
) -> TestApp {
    let collaborators = Collaborators {
        catalog: catalog.map(|c| c as Arc<dyn InstrumentCatalog>),
        downloader: Arc::new(downloader),
        orders: orders.map(|o| o as Arc<dyn OrderGateway>),
    };
    let state = build_state_with(config, credentials, collaborators)
        .await
        .unwrap();
    TestApp {
        router: app_router(state.clone(), config),
        state,
    }
}

pub async fn call(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn post_alert(router: &Router, alert: Value) -> (StatusCode, Value) {
    call(router, Method::POST, "/webhook", Some(&alert.to_string())).await
}
