use artifact_synth::api::routes::create_router;
use artifact_synth::config::ControlPlaneConfig;
use artifact_synth::publisher::{ImportClient, ImportedRevision, RevisionDeployment};
use artifact_synth::{AppState, EntityMirrorStore, PublisherError, ZipPacker};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Debug, Clone, PartialEq)]
struct DeleteCall {
    api_id: String,
    revision_id: String,
    payload: Vec<RevisionDeployment>,
}

/// Import client that records calls instead of reaching a backend
#[derive(Default)]
struct RecordingClient {
    fail: bool,
    imports: Mutex<Vec<(String, Vec<u8>)>>,
    deletes: Mutex<Vec<DeleteCall>>,
}

impl RecordingClient {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn rejection(&self) -> PublisherError {
        PublisherError::Rejected {
            status: 500,
            body: "backend unavailable".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ImportClient for RecordingClient {
    async fn import_api(
        &self,
        archive_name: &str,
        archive: Vec<u8>,
    ) -> Result<ImportedRevision, PublisherError> {
        if self.fail {
            return Err(self.rejection());
        }
        self.imports.lock().push((archive_name.to_string(), archive));
        Ok(ImportedRevision {
            id: "imported-api".to_string(),
            revision_id: "rev-1".to_string(),
        })
    }

    async fn delete_api_revision(
        &self,
        api_id: &str,
        revision_id: &str,
        payload: &[RevisionDeployment],
    ) -> Result<(), PublisherError> {
        self.deletes.lock().push(DeleteCall {
            api_id: api_id.to_string(),
            revision_id: revision_id.to_string(),
            payload: payload.to_vec(),
        });
        if self.fail {
            return Err(self.rejection());
        }
        Ok(())
    }
}

fn app(client: Arc<RecordingClient>) -> Router {
    let state = AppState::new(
        Arc::new(EntityMirrorStore::new("carbon.super")),
        client,
        Arc::new(ZipPacker),
        ControlPlaneConfig {
            environment_labels: vec!["Default".to_string(), "Edge".to_string()],
            ..Default::default()
        },
    );
    create_router().with_state(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body)
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn create_event() -> Value {
    json!({
        "event": "CREATE",
        "api": {
            "apiUUID": "pets-uuid",
            "apiName": "pets",
            "apiVersion": "1.0",
            "apiType": "REST",
            "basePath": "/pets/1.0",
            "vhost": "pets.example.com",
            "endpointProtocol": "https",
            "prodEndpoint": "api.example.com",
            "definition": "openapi: 3.0.1\npaths:\n  /pets:\n    get:\n      responses: {}\n",
            "operations": [
                {"path": "/pets", "verb": "GET", "scopes": ["read"]}
            ]
        }
    })
}

#[tokio::test]
async fn test_health() {
    let app = app(Arc::new(RecordingClient::default()));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_delete_event_undeploys_revision() {
    let client = Arc::new(RecordingClient::default());
    let app = app(client.clone());

    let event = json!({
        "event": "DELETE",
        "api": {"apiUUID": "X", "revisionID": "2", "vhost": "foo"}
    });
    let (status, body) = send(&app, "POST", "/apis", Some(event.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Success"}));

    let deletes = client.deletes.lock();
    assert_eq!(
        *deletes,
        vec![DeleteCall {
            api_id: "X".to_string(),
            revision_id: "2".to_string(),
            payload: vec![RevisionDeployment {
                revision_uuid: "2".to_string(),
                name: "Default".to_string(),
                vhost: "foo".to_string(),
                display_on_devportal: true,
            }],
        }]
    );
}

#[tokio::test]
async fn test_delete_failure_is_service_unavailable() {
    let client = Arc::new(RecordingClient::failing());
    let app = app(client.clone());

    let event = json!({
        "event": "DELETE",
        "api": {"apiUUID": "X", "revisionID": "2", "vhost": "foo"}
    });
    let (status, body) = send(&app, "POST", "/apis", Some(event.to_string())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let message = body.as_str().expect("error body is a JSON string");
    assert!(message.contains("backend unavailable"));
    assert_eq!(client.deletes.lock().len(), 1);
}

#[tokio::test]
async fn test_create_event_imports_archive() {
    let client = Arc::new(RecordingClient::default());
    let app = app(client.clone());

    let (status, body) = send(&app, "POST", "/apis", Some(create_event().to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "imported-api", "revisionID": "rev-1"}));

    let imports = client.imports.lock();
    assert_eq!(imports.len(), 1);
    let (name, bytes) = &imports[0];
    assert_eq!(name, "admin-pets-1.0.zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
    let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "pets-1.0/Definitions/swagger.yaml",
            "pets-1.0/api.yaml",
            "pets-1.0/deployment_environments.yaml",
        ]
    );

    let mut api_yaml = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("pets-1.0/api.yaml").unwrap(), &mut api_yaml)
        .unwrap();
    let api: serde_yaml::Value = serde_yaml::from_str(&api_yaml).unwrap();
    assert_eq!(api["data"]["context"], serde_yaml::Value::from("/pets"));
    assert_eq!(
        api["data"]["endpointConfig"]["production_endpoints"]["url"],
        serde_yaml::Value::from("https://api.example.com")
    );
    assert!(api["data"]["endpointConfig"].get("sandbox_endpoints").is_none());
}

#[tokio::test]
async fn test_create_failure_is_service_unavailable() {
    let app = app(Arc::new(RecordingClient::failing()));
    let (status, body) = send(&app, "POST", "/apis", Some(create_event().to_string())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.is_string());
}

#[tokio::test]
async fn test_create_event_with_null_collections_is_imported() {
    let client = Arc::new(RecordingClient::default());
    let app = app(client.clone());

    let mut event = create_event();
    event["api"]["securityScheme"] = Value::Null;
    event["api"]["apiProperties"] = Value::Null;
    event["api"]["operations"][0]["scopes"] = Value::Null;
    event["api"]["operations"][0]["filters"] = Value::Null;

    let (status, _) = send(&app, "POST", "/apis", Some(event.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.imports.lock().len(), 1);
}

#[tokio::test]
async fn test_malformed_event_is_bad_request() {
    let client = Arc::new(RecordingClient::default());
    let app = app(client.clone());

    let (status, body) = send(&app, "POST", "/apis", Some("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/apis",
        Some(json!({"event": "PATCH", "api": {}}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(client.imports.lock().is_empty());
    assert!(client.deletes.lock().is_empty());
}

#[tokio::test]
async fn test_application_snapshot_replaces_mirror() {
    let app = app(Arc::new(RecordingClient::default()));

    let first = json!({"list": [
        {"uuid": "b", "name": "second"},
        {"uuid": "a", "name": "first", "tenanDomain": "wso2.com"}
    ]});
    let (status, body) = send(&app, "PUT", "/applications", Some(first.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = send(&app, "GET", "/applications", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["list"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["uuid"], "a");
    assert_eq!(list[0]["tenanDomain"], "wso2.com");
    assert_eq!(list[1]["tenanDomain"], "carbon.super");

    let second = json!({"list": [{"uuid": "c", "name": "third"}]});
    send(&app, "PUT", "/applications", Some(second.to_string())).await;
    let (_, body) = send(&app, "GET", "/applications", None).await;
    let uuids: Vec<_> = body["list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|app| app["uuid"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(uuids, vec!["c"]);
}

#[tokio::test]
async fn test_other_snapshots() {
    let app = app(Arc::new(RecordingClient::default()));

    let subscriptions = json!({"list": [
        {"subscriptionId": 7, "apiUUID": "pets-uuid", "applicationUUID": "a", "subscriptionState": "UNBLOCKED"}
    ]});
    let (status, _) = send(&app, "PUT", "/subscriptions", Some(subscriptions.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/subscriptions", None).await;
    assert_eq!(body["list"][0]["subscriptionId"], 7);

    let mappings = json!({"list": [
        {"applicationUUID": "a", "consumerKey": "ck", "keyType": "PRODUCTION", "keyManager": "Resident Key Manager"}
    ]});
    send(&app, "PUT", "/applicationmappings", Some(mappings.to_string())).await;
    let (_, body) = send(&app, "GET", "/applicationmappings", None).await;
    assert_eq!(body["list"][0]["consumerKey"], "ck");

    let key_managers = json!({"list": [{"name": "Resident Key Manager", "enabled": true}]});
    send(&app, "PUT", "/keymanagers", Some(key_managers.to_string())).await;
    let (_, body) = send(&app, "GET", "/keymanagers", None).await;
    assert_eq!(body["list"][0]["name"], "Resident Key Manager");

    let (status, body) = send(&app, "PUT", "/keymanagers", Some(json!({"list": 5}).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
