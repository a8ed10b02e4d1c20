use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;

use storefront_core::AggregateId;
use storefront_products::{
    ActivateProduct, ArchiveProduct, ChangeBasePrice, CreateProduct, PricingMetadata,
    ProductCommand, ProductId,
};

use super::parse_product_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/activate", post(activate_product))
        .route("/:id/archive", post(archive_product))
        .route("/:id/base-price", put(change_base_price))
        .route("/:id/price", get(quote_price))
        .route("/:id/events", get(product_events))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let base_price = match body.base_price.map(dto::parse_money).transpose() {
        Ok(v) => v,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_price", msg),
    };

    // Best effort: the catalog trails the command side slightly.
    if services.sku_taken(&body.sku) {
        return errors::json_error(
            StatusCode::CONFLICT,
            "duplicate_sku",
            format!("SKU '{}' is already in use", body.sku.trim()),
        );
    }

    let agg = AggregateId::new();
    let cmd = ProductCommand::CreateProduct(CreateProduct {
        product_id: ProductId::new(agg),
        sku: body.sku,
        name: body.name,
        pricing: Some(PricingMetadata {
            base_price,
            currency: body.currency,
        }),
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch_product(cmd) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn activate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ProductCommand::ActivateProduct(ActivateProduct {
        product_id,
        occurred_at: Utc::now(),
    });
    match services.dispatch_product(cmd) {
        Ok(c) => committed_response(product_id, c.len()),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn archive_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ProductCommand::ArchiveProduct(ArchiveProduct {
        product_id,
        occurred_at: Utc::now(),
    });
    match services.dispatch_product(cmd) {
        Ok(c) => committed_response(product_id, c.len()),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn change_base_price(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeBasePriceRequest>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let base_price = match dto::parse_money(body.base_price) {
        Ok(v) => v,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_price", msg),
    };

    let cmd = ProductCommand::ChangeBasePrice(ChangeBasePrice {
        product_id,
        base_price,
        occurred_at: Utc::now(),
    });
    match services.dispatch_product(cmd) {
        Ok(c) => committed_response(product_id, c.len()),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.load_product(product_id) {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let items = services
        .catalog_list()
        .iter()
        .map(dto::catalog_entry_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// `GET /products/:id/price?quantity=N`: what an order line would cost now.
pub async fn quote_price(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::PriceQuery>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let quantity = match dto::parse_quantity(query.quantity) {
        Ok(q) => q,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_quantity", msg),
    };

    match services.checkout().quote(product_id, quantity) {
        Ok(quote) => (StatusCode::OK, Json(dto::quote_to_json(&quote))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Audit trail of a product: every committed event, oldest first.
pub async fn product_events(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.product_history(product_id) {
        Ok(events) => {
            let items = events.iter().map(dto::event_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

fn committed_response(product_id: ProductId, events_committed: usize) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": product_id.to_string(),
            "events_committed": events_committed,
        })),
    )
        .into_response()
}
