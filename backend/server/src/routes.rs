//! # Routes
//!
//! One handler per method and path, each doing at most one store operation
//! (plus an ownership lookup on guarded record routes).
//!
//! | Method | Path | Guarded |
//! |---|---|---|
//! | POST | `/jwt`, `/logout` | no |
//! | POST | `/food` | no |
//! | GET | `/foods`, `/foods/details/{id}`, `/foods/details/purchase/{id}` | no |
//! | POST | `/foods/purchase` | no |
//! | GET | `/foods/purchase/{food_id}` | no |
//! | PATCH | `/food/{id}` | token |
//! | GET | `/my-foods/{email}` | owner |
//! | GET, PUT | `/my-foods/update/{id}` | owner |
//! | GET | `/my-orders/{email}` | owner |
//! | DELETE | `/my-orders/delete/{id}` | owner |
//! | GET | `/home-foods` | no |
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::{
    auth::{Claims, authorize},
    database::{Store, TOP_SELLER_LIMIT},
    error::AppError,
    models::{
        Acknowledgement, DeleteResult, Food, FoodDetails, InsertResult, Purchase, PurchaseTotal,
        QuantityUpdate, Record, TokenRequest, TopSeller, UpdateResult,
    },
    state::AppState,
    utils::parse_id,
};

pub async fn health_handler() -> &'static str {
    "restaurant server is running"
}

pub async fn issue_token_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    Json(user): Json<TokenRequest>,
) -> Result<(CookieJar, Json<Acknowledgement>), AppError> {
    let token = state.tokens.issue_for(&user)?;
    info!("Issued token for {}", user.email);

    Ok((
        jar.add(state.tokens.cookie(token)),
        Json(Acknowledgement { success: true }),
    ))
}

pub async fn logout_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
) -> (CookieJar, Json<Acknowledgement>) {
    (
        jar.add(state.tokens.removal_cookie()),
        Json(Acknowledgement { success: true }),
    )
}

pub async fn create_food_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(food): Json<Map<String, Value>>,
) -> Result<Json<InsertResult>, AppError> {
    Ok(Json(state.store.insert_food(Record::new_document(food)).await?))
}

pub async fn list_foods_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Food>>, AppError> {
    Ok(Json(state.store.find_foods(None).await?))
}

pub async fn food_details_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Food>>, AppError> {
    Ok(Json(state.store.find_food(parse_id(&id)?).await?))
}

pub async fn purchase_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(purchase): Json<Map<String, Value>>,
) -> Result<Json<InsertResult>, AppError> {
    let purchase = Record::new_document(purchase);

    Ok(Json(state.store.insert_purchase(purchase).await?))
}

pub async fn total_purchased_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(food_id): Path<String>,
) -> Result<Json<PurchaseTotal>, AppError> {
    Ok(Json(state.store.total_purchased(&food_id).await?))
}

pub async fn update_quantity_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(update): Json<QuantityUpdate>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_id(&id)?;

    Ok(Json(state.store.set_food_quantity(id, update.quantity).await?))
}

pub async fn my_foods_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Food>>, AppError> {
    authorize(&claims, &email)?;

    Ok(Json(state.store.find_foods(Some(&email)).await?))
}

pub async fn edit_food_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Option<Food>>, AppError> {
    let food = state.store.find_food(parse_id(&id)?).await?;

    if let Some(food) = &food {
        authorize(&claims, food.email().unwrap_or_default())?;
    }

    Ok(Json(food))
}

pub async fn replace_food_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(food): Json<FoodDetails>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_id(&id)?;

    // ownership cannot be handed to someone else
    authorize(&claims, &food.email)?;

    if let Some(existing) = state.store.find_food(id).await? {
        authorize(&claims, existing.email().unwrap_or_default())?;
    }

    Ok(Json(state.store.upsert_food(id, food).await?))
}

pub async fn my_orders_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    authorize(&claims, &email)?;

    Ok(Json(state.store.find_purchases(&email).await?))
}

pub async fn delete_order_handler<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResult>, AppError> {
    let id = parse_id(&id)?;

    if let Some(purchase) = state.store.find_purchase(id).await? {
        authorize(&claims, purchase.email().unwrap_or_default())?;
    }

    Ok(Json(state.store.delete_purchase(id).await?))
}

pub async fn top_sellers_handler<S: Store>(State(state): State<Arc<AppState<S>>>) -> Response {
    match state.store.top_sellers(TOP_SELLER_LIMIT).await {
        Ok(top) => Json::<Vec<TopSeller>>(top).into_response(),
        Err(e) => {
            error!("Failed to fetch top sellers: {e}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch data" })),
            )
                .into_response()
        }
    }
}
