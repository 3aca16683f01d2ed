//! Documentation of a restaurant food ordering backend.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server over JSON, credentials travel in a cookie
//! - Every persisted record lives in MongoDB, two collections: `foods` and `purchases`
//! - No in-process state besides the store client and the token keys
//! - Concurrent writes to the same document are last-write-wins
//!
//!
//!
//! # Request Flow
//!
//! CORS + tracing layers → optional token guard → handler → one store call → JSON.
//!
//! - Public routes: menu browsing, purchasing, purchase totals, top sellers
//! - Token routes: anything that mutates or lists one user's records
//! - Ownership is checked by comparing the token email to the record email, see [`auth::authorize`]
//!
//!
//!
//! # Notes
//!
//! ## Purchases and Foods
//! `foodId` on a purchase is a plain string copy of a food id. Nothing checks it
//! points to an existing food, so orphaned purchases are expected and harmless.
//!
//! ## Stock
//! Purchasing does not decrement stock, the frontend follows up with
//! `PATCH /food/{id}`. The two calls are not atomic.
//!
//!
//!
//! # Setup
//!
//! Environment.
//! ```sh
//! export ACCESS_TOKEN_SECRET=...
//! export DB_USER=... DB_PASS=...
//! export RUST_LOG=info
//! ```
//!
//! Run without a database.
//! ```sh
//! STORE_BACKEND=memory ACCESS_TOKEN_SECRET=dev cargo run
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{delete, get, patch, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use auth::require_token;
use config::{Config, StoreConfig};
use database::{Store, init_mongo};
use memory::MemoryStore;
use routes::{
    create_food_handler, delete_order_handler, edit_food_handler, food_details_handler,
    health_handler, issue_token_handler, list_foods_handler, logout_handler, my_foods_handler,
    my_orders_handler, purchase_handler, replace_food_handler, top_sellers_handler,
    total_purchased_handler, update_quantity_handler,
};
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    match config.store.clone() {
        StoreConfig::Mongo { uri, database } => {
            let store = init_mongo(&uri, &database).await?;

            serve(AppState::new(config, store)).await
        }
        StoreConfig::Memory => {
            warn!("Using in-memory store, records are lost on shutdown");

            serve(AppState::new(config, MemoryStore::new())).await
        }
    }
}

async fn serve<S: Store>(state: Arc<AppState<S>>) -> anyhow::Result<()> {
    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn router<S: Store>(state: Arc<AppState<S>>) -> Router {
    let guarded = Router::new()
        .route("/food/{id}", patch(update_quantity_handler::<S>))
        .route("/my-foods/{email}", get(my_foods_handler::<S>))
        .route(
            "/my-foods/update/{id}",
            get(edit_food_handler::<S>).put(replace_food_handler::<S>),
        )
        .route("/my-orders/{email}", get(my_orders_handler::<S>))
        .route("/my-orders/delete/{id}", delete(delete_order_handler::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_token,
        ));

    Router::new()
        .route("/", get(health_handler))
        .route("/jwt", post(issue_token_handler::<S>))
        .route("/logout", post(logout_handler::<S>))
        .route("/food", post(create_food_handler::<S>))
        .route("/foods", get(list_foods_handler::<S>))
        .route("/foods/details/{id}", get(food_details_handler::<S>))
        .route("/foods/details/purchase/{id}", get(food_details_handler::<S>))
        .route("/foods/purchase", post(purchase_handler::<S>))
        .route("/foods/purchase/{food_id}", get(total_purchased_handler::<S>))
        .route("/home-foods", get(top_sellers_handler::<S>))
        .merge(guarded)
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter(|origin| {
            // rejected by tower-http next to `allow_credentials`
            let wildcard = origin.as_str() == "*";
            if wildcard {
                warn!("Ignoring wildcard CORS origin");
            }

            !wildcard
        })
        .filter_map(|origin| {
            origin
                .parse()
                .map_err(|_| warn!("Ignoring invalid CORS origin {origin}"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;

                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
