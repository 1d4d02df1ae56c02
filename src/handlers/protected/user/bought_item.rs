use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{BoughtItem, Currency};
use crate::error::ApiError;
use crate::middleware::{ApiResult, AuthUser};
use crate::services::PurchaseTarget;
use crate::state::AppState;
use crate::validation::{path_id, Checked, Payload};

#[derive(Debug, Deserialize)]
pub struct Purchase {
    pub vanity_item_id: Option<i64>,
    pub level_id: Option<i64>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

impl Payload for Purchase {
    const ALLOWED: &'static [&'static str] = &["vanity_item_id", "level_id", "amount", "currency"];

    fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if self.target().is_none() {
            invalid.extend(["vanity_item_id", "level_id"]);
        }
        if !self.amount.map(|n| n > 0).unwrap_or(false) {
            invalid.push("amount");
        }
        if self.currency().is_none() {
            invalid.push("currency");
        }
        invalid
    }
}

impl Purchase {
    /// Exactly one of the two ids, and positive
    fn target(&self) -> Option<PurchaseTarget> {
        match (self.vanity_item_id, self.level_id) {
            (Some(id), None) if id > 0 => Some(PurchaseTarget::VanityItem(id)),
            (None, Some(id)) if id > 0 => Some(PurchaseTarget::Level(id)),
            _ => None,
        }
    }

    fn currency(&self) -> Option<Currency> {
        self.currency
            .as_ref()
            .and_then(|c| Currency::try_from(c.trim().to_string()).ok())
    }
}

/// GET /user/:user_id/bought_item
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<BoughtItem>>> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;
    let items = state
        .bought_items()
        .list(user_id, crate::filter::MAX_LIMIT)
        .await?;
    Ok(Json(items))
}

/// POST /user/:user_id/bought_item - Buy a vanity item or a level.
///
/// The amount must equal the catalog price in the chosen currency. Coin
/// purchases are debited atomically; levels are sold for coins only.
pub async fn purchase(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Checked(body): Checked<Purchase>,
) -> ApiResult<(StatusCode, Json<BoughtItem>)> {
    let user_id = path_id(&user_id, "user_id")?;
    user.authorize(user_id)?;

    let (target, currency) = match (body.target(), body.currency()) {
        (Some(target), Some(currency)) => (target, currency),
        _ => return Err(ApiError::bad_request("Invalid payload")),
    };
    let amount = body.amount.unwrap_or_default();

    let service = state.bought_items();
    let price = match service.price(target, currency).await? {
        Some(price) => price,
        None => return Err(ApiError::invalid_field("Levels can only be bought with coins", "currency")),
    };
    if amount != price {
        return Err(ApiError::invalid_field("Amount does not match the catalog price", "amount"));
    }

    let item = service.purchase(user_id, target, amount, currency).await?;
    Ok((StatusCode::CREATED, Json(item)))
}
