use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ControlPlaneConfig;
use crate::logic::{package, ArchivePacker, ArtifactSynthesizer};
use crate::model::{
    ApiCpEvent, ApiDescriptor, ApiRevisionRef, Application, ApplicationKeyMapping, EntityList,
    KeyManager, Subscription,
};
use crate::publisher::{ImportClient, ImportedRevision, RevisionDeployment};
use crate::store::EntityMirrorStore;

/// Shared state handed to every handler
pub struct AppState<C> {
    pub store: Arc<EntityMirrorStore>,
    pub publisher: Arc<C>,
    pub packer: Arc<dyn ArchivePacker>,
    pub control_plane: Arc<ControlPlaneConfig>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
            packer: Arc::clone(&self.packer),
            control_plane: Arc::clone(&self.control_plane),
        }
    }
}

impl<C: ImportClient> AppState<C> {
    pub fn new(
        store: Arc<EntityMirrorStore>,
        publisher: Arc<C>,
        packer: Arc<dyn ArchivePacker>,
        control_plane: ControlPlaneConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            packer,
            control_plane: Arc::new(control_plane),
        }
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub message: String,
    pub count: usize,
}

/// Response of `POST /apis`: an acknowledgement for deletes, the imported
/// revision for creates and updates.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiEventResponse {
    Deleted(MessageResponse),
    Imported(ImportedRevision),
}

pub async fn handle_api_event<C: ImportClient>(
    State(state): State<AppState<C>>,
    payload: Result<Json<ApiCpEvent>, JsonRejection>,
) -> ApiResult<Json<ApiEventResponse>> {
    let Json(event) = payload.map_err(|rejection| {
        log::warn!("Rejected API event: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    })?;

    match event {
        ApiCpEvent::Delete { api } => {
            undeploy_revision(&state, &api).await?;
            Ok(Json(ApiEventResponse::Deleted(MessageResponse {
                message: "Success".to_string(),
            })))
        }
        ApiCpEvent::Deploy { api } => {
            let imported = import_artifact(&state, &api).await?;
            Ok(Json(ApiEventResponse::Imported(imported)))
        }
    }
}

async fn undeploy_revision<C: ImportClient>(
    state: &AppState<C>,
    api: &ApiRevisionRef,
) -> ApiResult<()> {
    log::info!("Delete event received with API UUID {}", api.api_uuid);

    let payload = vec![RevisionDeployment {
        revision_uuid: api.revision_id.clone(),
        name: state.control_plane.primary_environment(),
        vhost: api.vhost.clone(),
        display_on_devportal: true,
    }];

    state
        .publisher
        .delete_api_revision(&api.api_uuid, &api.revision_id, &payload)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to undeploy revision {} of API {}: {}",
                api.revision_id,
                api.api_uuid,
                e
            );
            ApiError::from(e)
        })
}

async fn import_artifact<C: ImportClient>(
    state: &AppState<C>,
    api: &ApiDescriptor,
) -> ApiResult<ImportedRevision> {
    log::info!(
        "Deploy event received for API {} {} ({})",
        api.api_name,
        api.api_version,
        api.identity()
    );

    let synthesizer = ArtifactSynthesizer::new(&state.control_plane);
    let packaged = synthesizer
        .synthesize(api)
        .and_then(|bundle| {
            package(
                state.packer.as_ref(),
                &synthesizer.provider(api),
                &bundle,
            )
        })
        .map_err(|e| {
            log::error!("Failed to build artifact for API {}: {}", api.api_name, e);
            ApiError::from(e)
        })?;

    let imported = state
        .publisher
        .import_api(&packaged.name, packaged.bytes)
        .await
        .map_err(|e| {
            log::error!("Failed to import {}: {}", packaged.name, e);
            ApiError::from(e)
        })?;

    log::info!(
        "Imported {} as API {} revision {}",
        packaged.name,
        imported.id,
        imported.revision_id
    );
    Ok(imported)
}

fn snapshot<T>(payload: Result<Json<EntityList<T>>, JsonRejection>) -> ApiResult<Vec<T>> {
    payload
        .map(|Json(snapshot)| snapshot.list)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn replaced(kind: &str, count: usize) -> Json<SnapshotResponse> {
    log::info!("Replaced {} snapshot with {} entries", kind, count);
    Json(SnapshotResponse {
        message: "Success".to_string(),
        count,
    })
}

pub async fn list_applications<C>(
    State(state): State<AppState<C>>,
) -> Json<EntityList<Application>> {
    Json(EntityList::new(state.store.list_applications()))
}

pub async fn replace_applications<C>(
    State(state): State<AppState<C>>,
    payload: Result<Json<EntityList<Application>>, JsonRejection>,
) -> ApiResult<Json<SnapshotResponse>> {
    let count = state.store.replace_applications(snapshot(payload)?);
    Ok(replaced("application", count))
}

pub async fn list_subscriptions<C>(
    State(state): State<AppState<C>>,
) -> Json<EntityList<Subscription>> {
    Json(EntityList::new(state.store.list_subscriptions()))
}

pub async fn replace_subscriptions<C>(
    State(state): State<AppState<C>>,
    payload: Result<Json<EntityList<Subscription>>, JsonRejection>,
) -> ApiResult<Json<SnapshotResponse>> {
    let count = state.store.replace_subscriptions(snapshot(payload)?);
    Ok(replaced("subscription", count))
}

pub async fn list_key_mappings<C>(
    State(state): State<AppState<C>>,
) -> Json<EntityList<ApplicationKeyMapping>> {
    Json(EntityList::new(state.store.list_key_mappings()))
}

pub async fn replace_key_mappings<C>(
    State(state): State<AppState<C>>,
    payload: Result<Json<EntityList<ApplicationKeyMapping>>, JsonRejection>,
) -> ApiResult<Json<SnapshotResponse>> {
    let count = state.store.replace_key_mappings(snapshot(payload)?);
    Ok(replaced("application key mapping", count))
}

pub async fn list_key_managers<C>(
    State(state): State<AppState<C>>,
) -> Json<EntityList<KeyManager>> {
    Json(EntityList::new(state.store.list_key_managers()))
}

pub async fn replace_key_managers<C>(
    State(state): State<AppState<C>>,
    payload: Result<Json<EntityList<KeyManager>>, JsonRejection>,
) -> ApiResult<Json<SnapshotResponse>> {
    let count = state.store.replace_key_managers(snapshot(payload)?);
    Ok(replaced("key manager", count))
}
