use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::publisher::ImportClient;

pub fn create_router<C: ImportClient + 'static>() -> Router<AppState<C>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API lifecycle events
        .route("/apis", post(handlers::handle_api_event::<C>))
        // Mirrored control-plane entities
        .route(
            "/applications",
            get(handlers::list_applications::<C>).put(handlers::replace_applications::<C>),
        )
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions::<C>).put(handlers::replace_subscriptions::<C>),
        )
        .route(
            "/applicationmappings",
            get(handlers::list_key_mappings::<C>).put(handlers::replace_key_mappings::<C>),
        )
        .route(
            "/keymanagers",
            get(handlers::list_key_managers::<C>).put(handlers::replace_key_managers::<C>),
        )
}
