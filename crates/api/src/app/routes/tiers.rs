//! Pricing tier administration.
//!
//! Every write goes through the product aggregate, which validates the
//! candidate against the product's active tiers before anything is stored.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
};
use chrono::Utc;

use storefront_core::TierId;
use storefront_products::{
    AddPricingTier, DeactivatePricingTier, ProductCommand, ProductId, ReactivatePricingTier,
    RemovePricingTier, ReplacePricingTier,
};

use super::{parse_product_id, parse_tier_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/:id/tiers", post(add_tier).get(list_tiers))
        .route("/:id/tiers/:tier_id", put(replace_tier).delete(remove_tier))
        .route("/:id/tiers/:tier_id/deactivate", post(deactivate_tier))
        .route("/:id/tiers/:tier_id/reactivate", post(reactivate_tier))
}

fn parse_ids(product: &str, tier: &str) -> Result<(ProductId, TierId), axum::response::Response> {
    Ok((parse_product_id(product)?, parse_tier_id(tier)?))
}

pub async fn list_tiers(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.load_product(product_id) {
        Ok(product) => {
            let mut tiers: Vec<_> = product.tiers().iter().collect();
            tiers.sort_by_key(|t| (t.bounds.min_quantity, t.tier_id));
            let items = tiers.into_iter().map(dto::tier_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn add_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::TierRequest>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let candidate = match body.into_form().parse() {
        Ok(c) => c,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    let tier_id = TierId::new();
    let cmd = ProductCommand::AddPricingTier(AddPricingTier {
        product_id,
        tier_id,
        candidate,
        occurred_at: Utc::now(),
    });
    if let Err(e) = services.dispatch_product(cmd) {
        return errors::dispatch_error_to_response(e);
    }

    tier_response(&services, StatusCode::CREATED, product_id, tier_id)
}

/// Edit a tier: the old tier is removed and the new one admitted in the same
/// commit, so a rejected edit leaves the old tier in place. The edited tier
/// gets a new id.
pub async fn replace_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, tier)): Path<(String, String)>,
    Json(body): Json<dto::TierRequest>,
) -> axum::response::Response {
    let (product_id, tier_id) = match parse_ids(&id, &tier) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let candidate = match body.into_form().parse() {
        Ok(c) => c,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    let new_tier_id = TierId::new();
    let cmd = ProductCommand::ReplacePricingTier(ReplacePricingTier {
        product_id,
        tier_id,
        new_tier_id,
        candidate,
        occurred_at: Utc::now(),
    });
    if let Err(e) = services.dispatch_product(cmd) {
        return errors::dispatch_error_to_response(e);
    }

    tier_response(&services, StatusCode::OK, product_id, new_tier_id)
}

pub async fn remove_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, tier)): Path<(String, String)>,
) -> axum::response::Response {
    let (product_id, tier_id) = match parse_ids(&id, &tier) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = ProductCommand::RemovePricingTier(RemovePricingTier {
        product_id,
        tier_id,
        occurred_at: Utc::now(),
    });
    match services.dispatch_product(cmd) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn deactivate_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, tier)): Path<(String, String)>,
) -> axum::response::Response {
    let (product_id, tier_id) = match parse_ids(&id, &tier) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = ProductCommand::DeactivatePricingTier(DeactivatePricingTier {
        product_id,
        tier_id,
        occurred_at: Utc::now(),
    });
    if let Err(e) = services.dispatch_product(cmd) {
        return errors::dispatch_error_to_response(e);
    }
    tier_response(&services, StatusCode::OK, product_id, tier_id)
}

/// Reactivation re-checks the tier against the currently active tiers; an
/// overlap added while it was inactive blocks it.
pub async fn reactivate_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, tier)): Path<(String, String)>,
) -> axum::response::Response {
    let (product_id, tier_id) = match parse_ids(&id, &tier) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cmd = ProductCommand::ReactivatePricingTier(ReactivatePricingTier {
        product_id,
        tier_id,
        occurred_at: Utc::now(),
    });
    if let Err(e) = services.dispatch_product(cmd) {
        return errors::dispatch_error_to_response(e);
    }
    tier_response(&services, StatusCode::OK, product_id, tier_id)
}

fn tier_response(
    services: &AppServices,
    status: StatusCode,
    product_id: ProductId,
    tier_id: TierId,
) -> axum::response::Response {
    let product = match services.load_product(product_id) {
        Ok(p) => p,
        Err(e) => return errors::dispatch_error_to_response(e),
    };
    match product.tiers().get(tier_id) {
        Some(tier) => (status, Json(dto::tier_to_json(tier))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "tier not found"),
    }
}
