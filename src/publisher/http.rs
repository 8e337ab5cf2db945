use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

use crate::config::PublisherConfig;
use crate::error::PublisherError;
use crate::publisher::traits::{ImportClient, ImportedRevision, RevisionDeployment};

const PUBLISHER_API_PATH: &str = "api/am/publisher/v4/apis";
const IMPORT_QUERY: &str = "preserveProvider=false&rotateRevision=true&overwrite=true";

/// Import response body; field names vary between backend versions
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportResponse {
    #[serde(alias = "apiId", alias = "apiUUID")]
    id: String,
    #[serde(alias = "revisionID", alias = "revisionId", alias = "revisionUuid")]
    revision_id: String,
}

/// Import client talking to the publisher REST API over HTTP
pub struct HttpImportClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpImportClient {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublisherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        if config.insecure_skip_verify {
            log::warn!("TLS certificate verification is disabled for {}", config.base_url);
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn import_url(&self) -> String {
        format!("{}/{}/import?{}", self.base_url, PUBLISHER_API_PATH, IMPORT_QUERY)
    }

    fn undeploy_url(&self, api_id: &str, revision_id: &str) -> String {
        format!(
            "{}/{}/{}/undeploy-revision?revisionId={}",
            self.base_url, PUBLISHER_API_PATH, api_id, revision_id
        )
    }
}

async fn ensure_success(response: Response) -> Result<Response, PublisherError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublisherError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait::async_trait]
impl ImportClient for HttpImportClient {
    async fn import_api(
        &self,
        archive_name: &str,
        archive: Vec<u8>,
    ) -> Result<ImportedRevision, PublisherError> {
        let part = Part::bytes(archive)
            .file_name(archive_name.to_string())
            .mime_str("application/zip")?;
        let form = Form::new().part("file", part);

        log::debug!("Importing {} into {}", archive_name, self.base_url);
        let response = self
            .client
            .post(self.import_url())
            .basic_auth(&self.username, Some(&self.password))
            .multipart(form)
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;

        let parsed: ImportResponse = serde_json::from_str(&body)
            .map_err(|e| PublisherError::InvalidResponse(format!("{}: {}", e, body)))?;
        if parsed.id.is_empty() {
            return Err(PublisherError::InvalidResponse(format!(
                "import response carries no API id: {}",
                body
            )));
        }

        Ok(ImportedRevision {
            id: parsed.id,
            revision_id: parsed.revision_id,
        })
    }

    async fn delete_api_revision(
        &self,
        api_id: &str,
        revision_id: &str,
        payload: &[RevisionDeployment],
    ) -> Result<(), PublisherError> {
        log::debug!("Undeploying revision {} of API {}", revision_id, api_id);
        let response = self
            .client
            .post(self.undeploy_url(api_id, revision_id))
            .basic_auth(&self.username, Some(&self.password))
            .json(payload)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
