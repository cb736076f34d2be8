use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use dhanbridge_symbols::DatasetOrigin;

use crate::{
    main_lib::AppState,
    models::{HealthResponse, ServiceInfo, StatusResponse},
};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let dataset = state.resolver.store().summary();
    let csv_status = match dataset.origin {
        DatasetOrigin::Local => "Loaded from local file",
        DatasetOrigin::Downloaded => "Loaded from download",
        DatasetOrigin::Empty => "Ready to fetch from Dhan API",
        DatasetOrigin::LoadError => "Error loading",
    };

    Json(StatusResponse {
        app_status: "running",
        dhan_status: if state.orders.is_some() {
            "connected"
        } else {
            "not connected"
        },
        dhan_error: state.broker_error.clone(),
        csv_status,
        csv_source: dataset.origin,
        csv_records: dataset.records,
        csv_error: dataset.error,
        csv_loaded_at: dataset.loaded_at,
        memory_cache_symbols: state.resolver.memory_len(),
        static_fallback_symbols: state.resolver.static_len(),
        remote_lookup: state.resolver.has_remote(),
        started_at: state.started_at,
        timestamp: Utc::now(),
    })
}

pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "TradingView to Dhan Bridge",
        version: env!("CARGO_PKG_VERSION"),
        status: "Ready",
        features: vec![
            "Dynamic security ID lookup from Dhan API",
            "Automatic CSV caching for frequent lookups",
            "Static fallback table when no dataset is available",
            "Environment variable configuration",
            "Health check endpoint",
        ],
    })
}
