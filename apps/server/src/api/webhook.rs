use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use tracing::{info, warn};

use crate::{
    broker::{OrderError, OrderRequest, TransactionType},
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{NotFoundDetails, ResponseDetails, WebhookAlert, WebhookResponse},
};

/// Receive a TradingView alert and place the matching market order.
///
/// Transport and authentication problems are HTTP errors. Everything after
/// that (unknown symbol, bad quantity, broker rejection) is a 200 reply with
/// `success: false`.
pub async fn receive_alert(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let alert: WebhookAlert = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;

    if !state
        .credentials
        .verify_webhook_secret(alert.secret.as_deref())
    {
        warn!("Rejected alert with invalid secret");
        return Err(ApiError::Unauthorized("Invalid secret".to_string()));
    }

    let symbol = alert.symbol();
    let exchange = alert.exchange();
    let instrument = alert.instrument();
    let action = alert.action();
    let quantity = alert.quantity();

    info!(
        "Webhook request: {} | {} | qty {:?} | {}:{}",
        symbol, action, quantity, exchange, instrument
    );

    let Some(orders) = state.orders.clone() else {
        return Ok(Json(WebhookResponse {
            details: state.broker_error.clone().map(ResponseDetails::Message),
            ..WebhookResponse::failure("Dhan connection not initialized")
        }));
    };

    let resolved = match state.resolver.resolve(&symbol, &instrument, &exchange).await {
        Ok(resolved) => resolved,
        Err(miss) => {
            warn!("Could not resolve security ID for {}", symbol);
            return Ok(Json(WebhookResponse {
                details: Some(ResponseDetails::NotFound(NotFoundDetails::from(miss))),
                ..WebhookResponse::failure(format!("Symbol '{}' not found", symbol))
            }));
        }
    };
    info!(
        "Security ID resolved: {} (via {})",
        resolved.security_id, resolved.tier
    );

    let (transaction_type, quantity) = match (TransactionType::from_action(&action), quantity) {
        (Some(transaction_type), Some(quantity)) if quantity > 0 => {
            (transaction_type, quantity as u64)
        }
        _ => return Ok(Json(WebhookResponse::failure("Invalid action or quantity"))),
    };

    let order = OrderRequest {
        security_id: resolved.security_id.clone(),
        transaction_type,
        quantity,
    };

    let response = match orders.place_order(&order).await {
        Ok(ack) => WebhookResponse {
            success: true,
            message: "Order placed successfully".to_string(),
            order_id: Some(ack.order_id),
            symbol: Some(symbol),
            action: Some(action),
            quantity: Some(quantity as i64),
            security_id: Some(resolved.security_id),
            ..Default::default()
        },
        Err(OrderError::Rejected { body, .. }) => WebhookResponse {
            response: Some(body),
            ..WebhookResponse::failure("Order failed")
        },
        Err(e) => WebhookResponse {
            symbol: Some(symbol),
            security_id: Some(resolved.security_id),
            ..WebhookResponse::failure(format!("Error placing order: {}", e))
        },
    };
    Ok(Json(response))
}
