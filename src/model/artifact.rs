use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::model::{
    ApiType, DeploymentStage, API_DOCUMENT_TYPE, API_DOCUMENT_VERSION,
    DEPLOYMENT_ENVIRONMENTS_DOCUMENT_TYPE, DEPLOYMENT_ENVIRONMENTS_DOCUMENT_VERSION,
    ENDPOINTS_DOCUMENT_TYPE, ENDPOINTS_DOCUMENT_VERSION,
};

/// Versioned envelope shared by every document in an artifact archive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub data: T,
}

impl<T> Document<T> {
    fn new(kind: &str, version: &str, data: T) -> Self {
        Self {
            kind: kind.to_string(),
            version: version.to_string(),
            data,
        }
    }
}

pub type ApiDocument = Document<ApiData>;
pub type EndpointsDocument = Document<Vec<EndpointDocument>>;
pub type DeploymentEnvironmentsDocument = Document<Vec<DeploymentEnvironment>>;

impl Document<ApiData> {
    pub fn api(data: ApiData) -> Self {
        Self::new(API_DOCUMENT_TYPE, API_DOCUMENT_VERSION, data)
    }
}

impl Document<Vec<EndpointDocument>> {
    pub fn endpoints(data: Vec<EndpointDocument>) -> Self {
        Self::new(ENDPOINTS_DOCUMENT_TYPE, ENDPOINTS_DOCUMENT_VERSION, data)
    }
}

impl Document<Vec<DeploymentEnvironment>> {
    pub fn deployment_environments(data: Vec<DeploymentEnvironment>) -> Self {
        Self::new(
            DEPLOYMENT_ENVIRONMENTS_DOCUMENT_TYPE,
            DEPLOYMENT_ENVIRONMENTS_DOCUMENT_VERSION,
            data,
        )
    }
}

/// Body of `api.yaml`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiData {
    pub name: String,
    pub context: String,
    pub version: String,
    pub organization_id: String,
    pub provider: String,
    pub life_cycle_status: String,
    pub response_caching_enabled: bool,
    pub cache_timeout: u32,
    pub has_thumbnail: bool,
    pub is_default_version: bool,
    pub is_revision: bool,
    pub enable_schema_validation: bool,
    pub enable_subscriber_verification: bool,
    #[serde(rename = "type")]
    pub api_type: String,
    pub transport: Vec<String>,
    pub endpoint_config: EndpointConfig<SecurityDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_production_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_sandbox_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_implementation_type: Option<String>,
    pub policies: Vec<String>,
    pub gateway_type: String,
    pub gateway_vendor: String,
    pub operations: Vec<ApiOperation>,
    pub additional_properties: Vec<AdditionalProperty>,
    pub security_scheme: Vec<String>,
    pub authorization_header: String,
    pub api_key_header: String,
    pub scopes: Vec<ScopeWrapper>,
    pub api_policies: OperationPolicies,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype_configuration: Option<SubtypeConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_configuration: Option<CorsConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tps: Option<MaxTps>,
}

/// `endpointConfig` block. Stage keys are omitted, not emptied, when a
/// stage has no URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointConfig<S> {
    pub endpoint_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_endpoints: Option<EndpointUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_endpoints: Option<EndpointUrl>,
    pub endpoint_security: EndpointSecurityConfig<S>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSecurityConfig<S> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<S>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<S>,
    #[serde(rename = "customParameters", skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDocument {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub security_type: String,
    pub username: String,
    pub password: String,
    pub api_key_identifier: String,
    pub api_key_value: String,
    pub api_key_identifier_type: String,
    pub additional_properties: BTreeMap<String, String>,
    pub custom_parameters: BTreeMap<String, String>,
    pub connection_timeout_duration: f64,
    pub socket_timeout_duration: f64,
    pub connection_request_timeout_duration: f64,
}

/// Stage security entry of `endpoints.yaml`. Carries no password and
/// renders `customParameters` as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSecurityDocument {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub security_type: String,
    pub api_key_identifier: String,
    pub api_key_value: String,
    pub api_key_identifier_type: String,
    pub username: String,
    pub custom_parameters: String,
    pub connection_timeout_duration: f64,
    pub connection_request_timeout_duration: f64,
    pub socket_timeout_duration: f64,
    pub grant_type: String,
    pub token_url: String,
    pub proxy_configs: ProxyConfigs,
}

/// Proxy settings, always emitted empty
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfigs {
    pub proxy_enabled: String,
    pub proxy_host: String,
    pub proxy_port: String,
    pub proxy_username: String,
    pub proxy_password: String,
    pub proxy_protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOperation {
    pub id: String,
    pub target: String,
    pub verb: String,
    pub auth_type: String,
    pub throttling_policy: String,
    pub scopes: Vec<String>,
    pub used_product_ids: Vec<String>,
    pub operation_policies: OperationPolicies,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationPolicies {
    pub request: Vec<OperationPolicy>,
    pub response: Vec<OperationPolicy>,
    pub fault: Vec<OperationPolicy>,
}

impl OperationPolicies {
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty() && self.fault.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPolicy {
    pub policy_name: String,
    pub policy_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
    pub parameters: PolicyParameters,
}

/// Parameters of an operation policy.
///
/// Every variant renders as a flat map of string-valued keys; nested
/// configuration is carried as an encoded string.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyParameters {
    Header { name: String, value: Option<String> },
    Mirror { url: String },
    Redirect { url: String },
    WeightedRouting(ModelRoutingConfig),
}

impl PolicyParameters {
    /// Render the parameters into their flat key/value form
    pub fn to_flat_map(&self) -> Result<BTreeMap<&'static str, String>, serde_json::Error> {
        let mut map = BTreeMap::new();
        match self {
            PolicyParameters::Header { name, value } => {
                map.insert("headerName", name.clone());
                if let Some(value) = value {
                    map.insert("headerValue", value.clone());
                }
            }
            PolicyParameters::Mirror { url } | PolicyParameters::Redirect { url } => {
                map.insert("url", url.clone());
            }
            PolicyParameters::WeightedRouting(config) => {
                let json = serde_json::to_string(config)?;
                map.insert("weightedRoundRobinConfigs", json.replace('"', "'"));
            }
        }
        Ok(map)
    }
}

impl Serialize for PolicyParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat = self.to_flat_map().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(Some(flat.len()))?;
        for (key, value) in &flat {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRoutingConfig {
    pub production: Vec<ModelEndpointWeight>,
    pub sandbox: Vec<ModelEndpointWeight>,
    pub suspend_duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEndpointWeight {
    pub model: String,
    pub endpoint_id: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeWrapper {
    pub scope: Scope,
    pub shared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub bindings: Vec<String>,
}

impl ScopeWrapper {
    pub fn named(name: &str) -> Self {
        Self {
            scope: Scope {
                name: name.to_string(),
                display_name: name.to_string(),
                description: name.to_string(),
                bindings: Vec::new(),
            },
            shared: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditionalProperty {
    pub name: String,
    pub value: String,
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtypeConfiguration {
    pub subtype: String,
    #[serde(rename = "_configuration")]
    pub configuration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsConfiguration {
    pub cors_configuration_enabled: bool,
    pub access_control_allow_origins: Vec<String>,
    pub access_control_allow_credentials: bool,
    pub access_control_allow_headers: Vec<String>,
    pub access_control_allow_methods: Vec<String>,
    pub access_control_expose_headers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxTps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_time_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_time_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_based_throttling_configuration: Option<TokenThrottlingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenThrottlingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_max_prompt_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_max_completion_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_max_total_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_max_prompt_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_max_completion_token_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_max_total_token_count: Option<u64>,
    pub is_token_based_throttling_enabled: bool,
}

/// One entry of `endpoints.yaml`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDocument {
    pub id: String,
    pub name: String,
    pub deployment_stage: DeploymentStage,
    pub endpoint_config: EndpointConfig<StageSecurityDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEnvironment {
    pub display_on_devportal: bool,
    pub deployment_environment: String,
    pub deployment_vhost: String,
}

/// Documents synthesized for one API, ready to be packaged
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle {
    pub api_name: String,
    pub api_version: String,
    pub api_type: ApiType,
    pub api: ApiDocument,
    pub endpoints: Option<EndpointsDocument>,
    pub deployment_environments: DeploymentEnvironmentsDocument,
    /// Schema text, rewritten for REST APIs
    pub definition: String,
}

impl ArtifactBundle {
    /// Top-level directory inside the archive
    pub fn root_dir(&self) -> String {
        format!("{}-{}", self.api_name, self.api_version)
    }

    pub fn definition_path(&self) -> String {
        match self.api_type {
            ApiType::GraphQl => format!("{}/Definitions/schema.graphql", self.root_dir()),
            ApiType::Rest => format!("{}/Definitions/swagger.yaml", self.root_dir()),
        }
    }
}
