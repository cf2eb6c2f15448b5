//! Order creation, payment, and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{LineItemRequest, OrderView};
use serde::Deserialize;
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItemRequest>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub paid: Option<bool>,
}

// -- Handlers --

/// POST /orders — create an order, withdrawing stock for every item.
#[tracing::instrument(skip(state, req), fields(line_items = req.items.len()))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let view = state.order_service.create_order(req.items).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /orders — list all orders, or only those matching `?paid=`.
#[tracing::instrument(skip(state, query), fields(paid = ?query.paid))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = match query.paid {
        Some(paid) => state.order_service.get_orders_by_paid_status(paid).await?,
        None => state.order_service.get_all_orders().await?,
    };
    Ok(Json(orders))
}

/// GET /orders/:id — load a single order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = OrderId::new(parse_id(&id)?);
    Ok(Json(state.order_service.get_order(order_id).await?))
}

/// POST /orders/:id/pay — mark an order as paid.
#[tracing::instrument(skip(state))]
pub async fn pay<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = OrderId::new(parse_id(&id)?);
    Ok(Json(state.order_service.pay_order(order_id).await?))
}
