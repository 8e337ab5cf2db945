use serde::{Deserialize, Serialize};

use crate::error::PublisherError;

/// Identifiers the management backend assigned to an imported archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedRevision {
    pub id: String,
    #[serde(rename = "revisionID")]
    pub revision_id: String,
}

/// Gateway deployment a revision is removed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDeployment {
    pub revision_uuid: String,
    pub name: String,
    pub vhost: String,
    pub display_on_devportal: bool,
}

#[async_trait::async_trait]
pub trait ImportClient: Send + Sync {
    async fn import_api(
        &self,
        archive_name: &str,
        archive: Vec<u8>,
    ) -> Result<ImportedRevision, PublisherError>;

    async fn delete_api_revision(
        &self,
        api_id: &str,
        revision_id: &str,
        payload: &[RevisionDeployment],
    ) -> Result<(), PublisherError>;
}
