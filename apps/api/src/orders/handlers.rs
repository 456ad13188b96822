//! Axum route handlers for the Orders API.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::count_pages_in_text;
use crate::errors::AppError;
use crate::orders::{self, OrderStatus};
use crate::progress::TracingProgress;
use crate::state::AppState;
use crate::workgen::{generate_work, WorkReport};

const MAX_ORDER_PAGES: u32 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub theme: String,
    pub pages: u32,
    pub work_type: String,
    /// Model override; falls back to the configured default.
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub id: i64,
    pub theme: String,
    pub pages: i64,
    pub work_type: String,
    pub model: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub has_tex: bool,
    /// Page estimate of the stored document body, when one exists.
    pub estimated_pages: Option<f32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orders
pub async fn handle_create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    if request.theme.trim().is_empty() {
        return Err(AppError::Validation("theme cannot be empty".to_string()));
    }
    if request.pages == 0 || request.pages > MAX_ORDER_PAGES {
        return Err(AppError::Validation(format!(
            "pages must be between 1 and {MAX_ORDER_PAGES}"
        )));
    }
    if request.work_type.trim().is_empty() {
        return Err(AppError::Validation(
            "work_type cannot be empty".to_string(),
        ));
    }

    let model = request
        .model
        .unwrap_or_else(|| state.config.default_model.clone());

    let order_id = orders::create_order(
        &state.db,
        request.theme.trim(),
        request.pages,
        request.work_type.trim(),
        &model,
    )
    .await?;

    Ok(Json(CreateOrderResponse {
        order_id,
        status: OrderStatus::Created,
    }))
}

/// GET /api/v1/orders/:id
pub async fn handle_get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let order = orders::get_order(&state.db, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

    let estimated_pages = order
        .full_tex
        .as_deref()
        .map(|tex| count_pages_in_text(tex, &state.budget));

    Ok(Json(OrderDetailResponse {
        id: order.id,
        theme: order.theme,
        pages: order.pages,
        work_type: order.work_type,
        model: order.model,
        status: order.status,
        created_at: order.created_at,
        has_tex: estimated_pages.is_some(),
        estimated_pages,
    }))
}

/// POST /api/v1/orders/:id/generate
///
/// Runs the whole pipeline synchronously and returns the report. Progress
/// goes to the log; the request stays open for the duration of generation.
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<WorkReport>, AppError> {
    let report = generate_work(&state, order_id, &TracingProgress).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_request_deserializes_without_model() {
        let json = serde_json::json!({
            "theme": "Graph Databases",
            "pages": 20,
            "work_type": "coursework"
        });
        let request: CreateOrderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.pages, 20);
        assert!(request.model.is_none());
    }

    #[test]
    fn test_order_detail_response_serializes() {
        let response = OrderDetailResponse {
            id: 3,
            theme: "T".to_string(),
            pages: 10,
            work_type: "essay".to_string(),
            model: "m".to_string(),
            status: OrderStatus::Completed,
            created_at: Utc::now(),
            has_tex: true,
            estimated_pages: Some(9.6),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["has_tex"], true);
    }
}
