pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod publisher;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;
pub use api::{ApiError, AppState};

pub use error::{PublisherError, SynthesisError};

// Export logic types
pub use logic::{
    package, ArchivePacker, ArtifactSynthesizer, EndpointResolver, OperationMatcher,
    PolicyBuilder, ZipPacker,
};

// Export all model types
pub use model::*;

pub use publisher::{HttpImportClient, ImportClient};

// Export store types
pub use store::EntityMirrorStore;

/// Build the application state from configuration and serve until shutdown
pub async fn run_server(config: crate::config::AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    let store = Arc::new(EntityMirrorStore::new(
        config.control_plane.tenant_domain.clone(),
    ));
    let publisher = Arc::new(HttpImportClient::new(&config.publisher)?);
    let state = AppState::new(
        store,
        publisher,
        Arc::new(ZipPacker),
        config.control_plane.clone(),
    );

    let app = crate::api::routes::create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
