use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub type Id = String;

pub const API_DOCUMENT_TYPE: &str = "api";
pub const API_DOCUMENT_VERSION: &str = "v4.6.0";
pub const ENDPOINTS_DOCUMENT_TYPE: &str = "endpoints";
pub const ENDPOINTS_DOCUMENT_VERSION: &str = "v4.6.0";
pub const DEPLOYMENT_ENVIRONMENTS_DOCUMENT_TYPE: &str = "deployment_environments";
pub const DEPLOYMENT_ENVIRONMENTS_DOCUMENT_VERSION: &str = "v4.3.0";

pub const DEFAULT_AUTH_TYPE: &str = "Application & Application User";
pub const UNLIMITED_TIER: &str = "Unlimited";
pub const LIFECYCLE_CREATED: &str = "CREATED";
pub const GATEWAY_TYPE: &str = "wso2/apk";
pub const GATEWAY_VENDOR: &str = "wso2";
pub const ENDPOINT_IMPLEMENTATION_TYPE: &str = "ENDPOINT";
pub const DEFAULT_SECURITY_TYPE: &str = "NONE";
pub const DEFAULT_API_KEY_PLACEMENT: &str = "HEADER";
pub const UNSET_TIMEOUT: f64 = -1.0;
pub const CACHE_TIMEOUT_SECS: u32 = 300;

/// Literal every `{param}` segment of a schema path is rewritten to before matching.
pub const PATH_PARAM_PLACEHOLDER: &str = "hardcode";
/// Name of the synthetic OAuth2 scheme injected into REST schemas.
pub const DEFAULT_SECURITY_SCHEME: &str = "default";
pub const DEFAULT_AUTHORIZATION_URL: &str = "https://test.com";

/// Read an explicit `null` as the type's default. Pair with
/// `#[serde(default)]` so a missing field is covered too.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

pub const POLICY_ADD_HEADER: &str = "addHeader";
pub const POLICY_REMOVE_HEADER: &str = "removeHeader";
pub const POLICY_MIRROR_REQUEST: &str = "mirrorRequest";
pub const POLICY_REDIRECT_REQUEST: &str = "redirectRequest";
pub const POLICY_MODEL_WEIGHTED_ROUND_ROBIN: &str = "modelWeightedRoundRobin";
pub const POLICY_VERSION_V1: &str = "v1";
pub const POLICY_TYPE_COMMON: &str = "common";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStage {
    Production,
    Sandbox,
}

impl DeploymentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStage::Production => "PRODUCTION",
            DeploymentStage::Sandbox => "SANDBOX",
        }
    }

    /// Human readable stage name used in endpoint display names
    pub fn display_name(&self) -> &'static str {
        match self {
            DeploymentStage::Production => "Production",
            DeploymentStage::Sandbox => "Sandbox",
        }
    }
}

/// Generate a deterministic endpoint identifier.
///
/// The same API identity, stage, position and URL always yield the same
/// identifier, so re-synthesizing an unchanged event produces identical
/// documents. The stage is appended as `--PRODUCTION` / `--SANDBOX`.
pub fn generate_endpoint_id(
    api_identity: &str,
    stage: DeploymentStage,
    position: usize,
    url: &str,
) -> Id {
    let mut hasher = Sha256::new();
    hasher.update(api_identity.as_bytes());
    hasher.update([0u8]);
    hasher.update(stage.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(position.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    let uuid: Uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();

    format!("{}--{}", uuid, stage.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_is_stable_and_suffixed() {
        let a = generate_endpoint_id("pets:1.0", DeploymentStage::Production, 0, "https://a");
        let b = generate_endpoint_id("pets:1.0", DeploymentStage::Production, 0, "https://a");
        assert_eq!(a, b);
        assert!(a.ends_with("--PRODUCTION"));
        assert_eq!(a.len(), 36 + "--PRODUCTION".len());
    }

    #[test]
    fn test_endpoint_id_differs_by_position_and_stage() {
        let first = generate_endpoint_id("pets:1.0", DeploymentStage::Sandbox, 0, "https://a");
        let second = generate_endpoint_id("pets:1.0", DeploymentStage::Sandbox, 1, "https://a");
        let prod = generate_endpoint_id("pets:1.0", DeploymentStage::Production, 0, "https://a");
        assert_ne!(first, second);
        assert_ne!(first, prod);
        assert!(first.ends_with("--SANDBOX"));
    }
}
