use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use storefront_core::AggregateId;
use storefront_sales::{ConfirmOrder, CreateSalesOrder, SalesOrderCommand, SalesOrderId};

use super::{parse_order_id, parse_product_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/lines", post(add_line))
        .route("/:id/confirm", post(confirm_order))
}

pub async fn create_order(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let agg = AggregateId::new();
    let cmd = SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
        order_id: SalesOrderId::new(agg),
        occurred_at: Utc::now(),
    });

    match services.dispatch_order(cmd) {
        Ok(committed) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.load_order(order_id) {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Add a line priced by the product's tiers at this moment.
pub async fn add_line(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddLineRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id = match parse_product_id(&body.product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let quantity = match dto::parse_quantity(body.quantity.map(dto::FieldValue::into_text)) {
        Ok(q) => q,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_quantity", msg),
    };

    match services.checkout().add_line(order_id, product_id, quantity) {
        Ok(quote) => (StatusCode::CREATED, Json(dto::quote_to_json(&quote))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn confirm_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = SalesOrderCommand::ConfirmOrder(ConfirmOrder {
        order_id,
        occurred_at: Utc::now(),
    });
    if let Err(e) = services.dispatch_order(cmd) {
        return errors::dispatch_error_to_response(e);
    }
    match services.load_order(order_id) {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
