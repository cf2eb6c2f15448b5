//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the metrics emitted by the order service.
pub fn describe() {
    metrics::describe_counter!("orders_created_total", "Orders committed successfully");
    metrics::describe_counter!(
        "orders_rejected_total",
        "Order creation attempts rolled back, labelled by reason"
    );
    metrics::describe_counter!("orders_paid_total", "Orders moved to the paid state");
    metrics::describe_histogram!(
        "order_creation_duration_seconds",
        Unit::Seconds,
        "Time spent creating an order, including rejected attempts"
    );
}

/// GET /metrics — returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
