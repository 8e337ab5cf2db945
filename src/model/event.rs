use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::null_as_default;

/// Lifecycle event posted by the gateway adapter to `POST /apis`.
///
/// The `event` field selects the shape: `CREATE`/`UPDATE` carry a full API
/// descriptor, `DELETE` only needs the revision reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ApiCpEvent {
    #[serde(rename = "CREATE", alias = "UPDATE")]
    Deploy { api: ApiDescriptor },
    #[serde(rename = "DELETE")]
    Delete { api: ApiRevisionRef },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiType {
    #[default]
    #[serde(rename = "REST", alias = "rest", alias = "Rest", alias = "HTTP", alias = "http")]
    Rest,
    #[serde(rename = "GraphQL", alias = "GRAPHQL", alias = "graphql", alias = "GraphQl")]
    GraphQl,
}

/// Reference to a deployed revision, used by delete events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiRevisionRef {
    #[serde(rename = "apiUUID")]
    pub api_uuid: String,
    #[serde(rename = "revisionID")]
    pub revision_id: String,
    pub vhost: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiDescriptor {
    #[serde(rename = "apiUUID")]
    pub api_uuid: String,
    pub api_name: String,
    pub api_version: String,
    pub is_default_version: bool,
    /// OpenAPI (YAML or JSON) or GraphQL SDL text
    pub definition: String,
    pub api_type: ApiType,
    pub api_sub_type: String,
    pub base_path: String,
    pub organization: String,
    pub provider: String,
    #[serde(rename = "revisionID")]
    pub revision_id: String,
    pub vhost: String,
    #[serde(deserialize_with = "null_as_default")]
    pub security_scheme: Vec<String>,
    pub auth_header: String,
    pub api_key_header: String,
    pub endpoint_protocol: String,
    pub prod_endpoint: String,
    pub sand_endpoint: String,
    #[serde(deserialize_with = "null_as_default")]
    pub prod_endpoint_security: EndpointSecurity,
    #[serde(deserialize_with = "null_as_default")]
    pub sand_endpoint_security: EndpointSecurity,
    #[serde(deserialize_with = "null_as_default")]
    pub multi_endpoints: MultiEndpoints,
    pub cors_policy: Option<CorsPolicy>,
    #[serde(rename = "prodAIRL")]
    pub prod_airl: Option<AiRateLimit>,
    #[serde(rename = "sandAIRL")]
    pub sand_airl: Option<AiRateLimit>,
    #[serde(deserialize_with = "null_as_default")]
    pub ai_configuration: AiConfiguration,
    pub ai_model_based_round_robin: Option<ModelBasedRoundRobin>,
    #[serde(deserialize_with = "null_as_default")]
    pub api_properties: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub operations: Vec<DeclaredOperation>,
}

impl ApiDescriptor {
    /// Stable identity used to seed generated identifiers
    pub fn identity(&self) -> String {
        if self.api_uuid.is_empty() {
            format!("{}:{}", self.api_name, self.api_version)
        } else {
            self.api_uuid.clone()
        }
    }

    pub fn is_graphql(&self) -> bool {
        self.api_type == ApiType::GraphQl
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointSecurity {
    #[serde(alias = "securityEnabled")]
    pub enabled: bool,
    pub security_type: String,
    pub basic_username: String,
    pub basic_password: String,
    pub api_key_name: String,
    pub api_key_value: String,
    pub api_key_in: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiEndpoints {
    pub protocol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub prod_endpoints: Vec<EndpointEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub sand_endpoints: Vec<EndpointEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointEntry {
    pub url: String,
    #[serde(flatten)]
    pub security: EndpointSecurity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorsPolicy {
    #[serde(deserialize_with = "null_as_default")]
    pub access_control_allow_origins: Vec<String>,
    pub access_control_allow_credentials: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub access_control_allow_headers: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub access_control_allow_methods: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub access_control_expose_headers: Vec<String>,
}

/// AI rate limit for one deployment stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiRateLimit {
    pub request_count: u64,
    pub time_unit: String,
    pub prompt_token_count: Option<u64>,
    pub completion_token_count: Option<u64>,
    pub total_token_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfiguration {
    pub llm_provider_id: String,
    pub llm_provider_name: String,
    pub llm_provider_api_version: String,
}

impl AiConfiguration {
    pub fn is_complete(&self) -> bool {
        !self.llm_provider_id.is_empty()
            && !self.llm_provider_name.is_empty()
            && !self.llm_provider_api_version.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelBasedRoundRobin {
    pub on_quota_exceed_suspend_duration: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub production_models: Vec<ModelWeight>,
    #[serde(deserialize_with = "null_as_default")]
    pub sandbox_models: Vec<ModelWeight>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelWeight {
    pub model: String,
    /// Full backend URL, matched against resolved endpoint URLs
    pub endpoint: String,
    pub weight: u32,
}

/// Operation as declared by the upstream adapter.
///
/// `path` is a regular expression matched against normalized schema paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclaredOperation {
    pub path: String,
    pub verb: String,
    #[serde(deserialize_with = "null_as_default")]
    pub scopes: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub filters: Vec<OperationFilter>,
    pub ai_model_based_round_robin: Option<ModelBasedRoundRobin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationFilter {
    #[serde(rename_all = "camelCase")]
    Headers {
        #[serde(default, deserialize_with = "null_as_default")]
        request_headers: HeaderModifier,
        #[serde(default, deserialize_with = "null_as_default")]
        response_headers: HeaderModifier,
    },
    MirrorRequest {
        #[serde(default, deserialize_with = "null_as_default")]
        urls: Vec<String>,
    },
    RedirectRequest { url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderModifier {
    #[serde(deserialize_with = "null_as_default")]
    pub add_headers: Vec<HeaderEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub remove_headers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_event_deserialization() {
        let json = r#"{
            "event": "CREATE",
            "api": {
                "apiUUID": "abc",
                "apiName": "pets",
                "apiVersion": "1.0",
                "apiType": "REST",
                "basePath": "/pets/1.0",
                "prodEndpoint": "api.example.com",
                "endpointProtocol": "https",
                "operations": [
                    {
                        "path": "/pets/(.*)",
                        "verb": "GET",
                        "scopes": ["read"],
                        "filters": [
                            {"type": "headers", "requestHeaders": {"addHeaders": [{"name": "x-a", "value": "1"}]}},
                            {"type": "mirrorRequest", "urls": ["http://mirror"]},
                            {"type": "redirectRequest", "url": "http://redirect"}
                        ]
                    }
                ]
            }
        }"#;

        match serde_json::from_str::<ApiCpEvent>(json) {
            Ok(ApiCpEvent::Deploy { api }) => {
                assert_eq!(api.api_name, "pets");
                assert_eq!(api.api_type, ApiType::Rest);
                assert_eq!(api.operations.len(), 1);
                let filters = &api.operations[0].filters;
                assert_eq!(filters.len(), 3);
                match &filters[0] {
                    OperationFilter::Headers { request_headers, response_headers } => {
                        assert_eq!(request_headers.add_headers[0].name, "x-a");
                        assert!(response_headers.add_headers.is_empty());
                    }
                    other => panic!("unexpected filter: {:?}", other),
                }
                assert_eq!(
                    filters[2],
                    OperationFilter::RedirectRequest { url: "http://redirect".to_string() }
                );
            }
            Ok(other) => panic!("create event matched the wrong shape: {:?}", other),
            Err(e) => panic!("create event failed to parse: {}", e),
        }
    }

    #[test]
    fn test_update_alias_and_graphql_type() {
        let json = r#"{"event": "UPDATE", "api": {"apiName": "g", "apiType": "GraphQL"}}"#;
        let event: ApiCpEvent = serde_json::from_str(json).unwrap();
        match event {
            ApiCpEvent::Deploy { api } => assert!(api.is_graphql()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_delete_event_ignores_extra_fields() {
        let json = r#"{"event": "DELETE", "api": {"apiUUID": "X", "revisionID": "2", "vhost": "foo", "apiName": "pets"}}"#;
        let event: ApiCpEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ApiCpEvent::Delete {
                api: ApiRevisionRef {
                    api_uuid: "X".to_string(),
                    revision_id: "2".to_string(),
                    vhost: "foo".to_string(),
                }
            }
        );
    }

    #[test]
    fn test_null_collections_read_as_empty() {
        let json = r#"{
            "event": "CREATE",
            "api": {
                "apiName": "pets",
                "apiVersion": "1.0",
                "securityScheme": null,
                "apiProperties": null,
                "prodEndpointSecurity": null,
                "aiConfiguration": null,
                "multiEndpoints": {"protocol": "https", "prodEndpoints": null, "sandEndpoints": null},
                "corsPolicy": {"accessControlAllowOrigins": null, "accessControlAllowCredentials": true},
                "operations": [
                    {
                        "path": "/pets",
                        "verb": "GET",
                        "scopes": null,
                        "filters": [
                            {"type": "headers", "requestHeaders": {"addHeaders": null, "removeHeaders": ["x-b"]}, "responseHeaders": null},
                            {"type": "mirrorRequest", "urls": null}
                        ]
                    },
                    {"path": "/owners", "verb": "GET", "filters": null}
                ]
            }
        }"#;

        let api = match serde_json::from_str::<ApiCpEvent>(json) {
            Ok(ApiCpEvent::Deploy { api }) => api,
            other => panic!("create event with null collections: {:?}", other),
        };
        assert!(api.security_scheme.is_empty());
        assert!(api.api_properties.is_empty());
        assert_eq!(api.prod_endpoint_security, EndpointSecurity::default());
        assert!(api.multi_endpoints.prod_endpoints.is_empty());
        assert_eq!(api.multi_endpoints.protocol, "https");
        let cors = api.cors_policy.as_ref().unwrap();
        assert!(cors.access_control_allow_origins.is_empty());
        assert!(cors.access_control_allow_credentials);

        assert_eq!(api.operations.len(), 2);
        assert!(api.operations[0].scopes.is_empty());
        assert_eq!(
            api.operations[0].filters,
            vec![
                OperationFilter::Headers {
                    request_headers: HeaderModifier {
                        add_headers: Vec::new(),
                        remove_headers: vec!["x-b".to_string()],
                    },
                    response_headers: HeaderModifier::default(),
                },
                OperationFilter::MirrorRequest { urls: Vec::new() },
            ]
        );
        assert!(api.operations[1].filters.is_empty());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let json = r#"{"event": "PATCH", "api": {}}"#;
        assert!(serde_json::from_str::<ApiCpEvent>(json).is_err());
    }

    #[test]
    fn test_identity_falls_back_to_name_and_version() {
        let api = ApiDescriptor {
            api_name: "pets".to_string(),
            api_version: "1.0".to_string(),
            ..Default::default()
        };
        assert_eq!(api.identity(), "pets:1.0");
    }
}
