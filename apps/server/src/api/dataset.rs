use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use dhanbridge_symbols::ProvisionReport;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::RefreshRequest,
};

/// Force a dataset download. Requires the webhook secret.
pub async fn refresh_dataset(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ProvisionReport>> {
    let request: RefreshRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;

    if !state
        .credentials
        .verify_webhook_secret(request.secret.as_deref())
    {
        return Err(ApiError::Unauthorized("Invalid secret".to_string()));
    }

    info!("Manual dataset refresh requested");
    Ok(Json(state.provisioner.refresh().await))
}
