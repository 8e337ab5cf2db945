use serde_yaml::Value;

use crate::config::ControlPlaneConfig;
use crate::error::SynthesisError;
use crate::logic::endpoints::{EndpointDescriptor, EndpointResolver, ResolvedEndpoints};
use crate::logic::operations::{inject_security_scheme, MatchedOperations, OperationMatcher};
use crate::logic::policies::PolicyBuilder;
use crate::model::{
    AdditionalProperty, AiRateLimit, ApiData, ApiDescriptor, ApiDocument, ArtifactBundle,
    CorsConfiguration, DeploymentEnvironment, DeploymentEnvironmentsDocument, DeploymentStage,
    Document, EndpointConfig, EndpointDocument, EndpointSecurity, EndpointSecurityConfig,
    EndpointUrl, MaxTps, OperationPolicies, ProxyConfigs, SecurityDocument,
    StageSecurityDocument, SubtypeConfiguration, TokenThrottlingConfig, CACHE_TIMEOUT_SECS,
    DEFAULT_API_KEY_PLACEMENT, DEFAULT_SECURITY_TYPE, ENDPOINT_IMPLEMENTATION_TYPE, GATEWAY_TYPE,
    GATEWAY_VENDOR, LIFECYCLE_CREATED, UNLIMITED_TIER, UNSET_TIMEOUT,
};

const DEFAULT_ENDPOINT_PROTOCOL: &str = "https";

/// OpenAPI document used for REST events that carry no definition
pub const DEFAULT_OPENAPI_DEFINITION: &str = r#"openapi: 3.0.1
info:
  title: default
  version: "1.0"
servers:
  - url: /
paths:
  /*:
    get:
      responses:
        "200":
          description: OK
    put:
      responses:
        "200":
          description: OK
    post:
      responses:
        "200":
          description: OK
    delete:
      responses:
        "200":
          description: OK
    patch:
      responses:
        "200":
          description: OK
"#;

/// Schema text plus the operations derived from it
struct ProcessedDefinition {
    definition: String,
    matched: MatchedOperations,
}

/// Builds the artifact bundle for a create/update event
pub struct ArtifactSynthesizer<'a> {
    control_plane: &'a ControlPlaneConfig,
}

impl<'a> ArtifactSynthesizer<'a> {
    pub fn new(control_plane: &'a ControlPlaneConfig) -> Self {
        Self { control_plane }
    }

    pub fn synthesize(&self, api: &ApiDescriptor) -> Result<ArtifactBundle, SynthesisError> {
        log::debug!(
            "Synthesizing artifact for API {} {} ({:?})",
            api.api_name,
            api.api_version,
            api.api_type
        );

        let endpoints = EndpointResolver::resolve(api);
        let processed = self.process_definition(api, &endpoints)?;
        let api_document = self.api_document(api, &endpoints, processed.matched);

        let endpoints_document = if endpoints.is_multi_endpoint() {
            Some(Document::endpoints(
                endpoints.descriptors.iter().map(endpoint_document).collect(),
            ))
        } else {
            None
        };

        Ok(ArtifactBundle {
            api_name: api.api_name.clone(),
            api_version: api.api_version.clone(),
            api_type: api.api_type,
            api: api_document,
            endpoints: endpoints_document,
            deployment_environments: self.deployment_environments(&api.vhost),
            definition: processed.definition,
        })
    }

    /// Provider recorded on the API: the event's own, else the configured one
    pub fn provider(&self, api: &ApiDescriptor) -> String {
        if api.provider.is_empty() {
            self.control_plane.provider.clone()
        } else {
            api.provider.clone()
        }
    }

    fn process_definition(
        &self,
        api: &ApiDescriptor,
        endpoints: &ResolvedEndpoints,
    ) -> Result<ProcessedDefinition, SynthesisError> {
        let matcher = OperationMatcher::new(&api.operations, endpoints);

        if api.is_graphql() {
            return Ok(ProcessedDefinition {
                definition: api.definition.clone(),
                matched: MatchedOperations {
                    operations: matcher.graphql_operations(),
                    scopes: Vec::new(),
                },
            });
        }

        let source = if api.definition.trim().is_empty() {
            log::debug!("API {} has no definition, using the default OpenAPI", api.api_name);
            DEFAULT_OPENAPI_DEFINITION
        } else {
            api.definition.as_str()
        };

        let mut schema: Value = match serde_yaml::from_str(source) {
            Ok(schema @ Value::Mapping(_)) => schema,
            Ok(_) => {
                log::warn!(
                    "Definition of API {} is not an OpenAPI document, packaging it unchanged",
                    api.api_name
                );
                return Ok(unprocessed(source));
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse definition of API {}, packaging it unchanged: {}",
                    api.api_name,
                    e
                );
                return Ok(unprocessed(source));
            }
        };

        let matched = matcher.annotate(&mut schema);
        inject_security_scheme(&mut schema, &matched.scopes);
        log::debug!(
            "Matched {} operations and {} scopes for API {}",
            matched.operations.len(),
            matched.scopes.len(),
            api.api_name
        );

        let definition =
            serde_yaml::to_string(&schema).map_err(SynthesisError::yaml("API definition"))?;
        Ok(ProcessedDefinition { definition, matched })
    }

    fn api_document(
        &self,
        api: &ApiDescriptor,
        endpoints: &ResolvedEndpoints,
        matched: MatchedOperations,
    ) -> ApiDocument {
        let multi_endpoint = endpoints.is_multi_endpoint();
        let production = endpoints.primary(DeploymentStage::Production);
        let sandbox = endpoints.primary(DeploymentStage::Sandbox);

        let (primary_production_endpoint_id, primary_sandbox_endpoint_id, implementation_type) =
            if multi_endpoint {
                (
                    Some(production.map(|d| d.id.clone()).unwrap_or_default()),
                    Some(sandbox.map(|d| d.id.clone()).unwrap_or_default()),
                    Some(ENDPOINT_IMPLEMENTATION_TYPE.to_string()),
                )
            } else {
                (None, None, None)
            };

        let api_policies = if api.is_graphql() {
            OperationPolicies::default()
        } else {
            PolicyBuilder::new(endpoints).api_policies(api.ai_model_based_round_robin.as_ref())
        };

        Document::api(ApiData {
            name: api.api_name.clone(),
            context: remove_version_suffix(&api.base_path, &api.api_version),
            version: api.api_version.clone(),
            organization_id: api.organization.clone(),
            provider: self.provider(api),
            life_cycle_status: LIFECYCLE_CREATED.to_string(),
            response_caching_enabled: false,
            cache_timeout: CACHE_TIMEOUT_SECS,
            has_thumbnail: false,
            is_default_version: api.is_default_version,
            is_revision: false,
            enable_schema_validation: false,
            enable_subscriber_verification: false,
            api_type: if api.is_graphql() { "GRAPHQL" } else { "HTTP" }.to_string(),
            transport: vec!["http".to_string(), "https".to_string()],
            endpoint_config: EndpointConfig {
                endpoint_type: endpoint_type(api),
                production_endpoints: stage_url(production),
                sandbox_endpoints: stage_url(sandbox),
                endpoint_security: EndpointSecurityConfig {
                    production: Some(security_document(&api.prod_endpoint_security)),
                    sandbox: Some(security_document(&api.sand_endpoint_security)),
                    custom_parameters: None,
                },
            },
            primary_production_endpoint_id,
            primary_sandbox_endpoint_id,
            endpoint_implementation_type: implementation_type,
            policies: vec![UNLIMITED_TIER.to_string()],
            gateway_type: GATEWAY_TYPE.to_string(),
            gateway_vendor: GATEWAY_VENDOR.to_string(),
            operations: matched.operations,
            additional_properties: api
                .api_properties
                .iter()
                .map(|(name, value)| AdditionalProperty {
                    name: name.clone(),
                    value: value.clone(),
                    display: false,
                })
                .collect(),
            security_scheme: api.security_scheme.clone(),
            authorization_header: api.auth_header.clone(),
            api_key_header: api.api_key_header.clone(),
            scopes: matched.scopes,
            api_policies,
            subtype_configuration: subtype_configuration(api),
            cors_configuration: api.cors_policy.as_ref().map(|cors| CorsConfiguration {
                cors_configuration_enabled: true,
                access_control_allow_origins: cors.access_control_allow_origins.clone(),
                access_control_allow_credentials: cors.access_control_allow_credentials,
                access_control_allow_headers: cors.access_control_allow_headers.clone(),
                access_control_allow_methods: cors.access_control_allow_methods.clone(),
                access_control_expose_headers: cors.access_control_expose_headers.clone(),
            }),
            max_tps: max_tps(api.prod_airl.as_ref(), api.sand_airl.as_ref()),
        })
    }

    fn deployment_environments(&self, vhost: &str) -> DeploymentEnvironmentsDocument {
        Document::deployment_environments(
            self.control_plane
                .environments()
                .into_iter()
                .map(|label| DeploymentEnvironment {
                    display_on_devportal: true,
                    deployment_environment: label,
                    deployment_vhost: vhost.to_string(),
                })
                .collect(),
        )
    }
}

fn unprocessed(source: &str) -> ProcessedDefinition {
    ProcessedDefinition {
        definition: source.to_string(),
        matched: MatchedOperations::default(),
    }
}

/// Strip a trailing `/<version>` segment from the base path.
///
/// `/pets/1.0` with version `1.0` becomes `/pets`; anything else is kept.
pub fn remove_version_suffix(base_path: &str, version: &str) -> String {
    if version.is_empty() {
        return base_path.to_string();
    }
    base_path
        .strip_suffix(version)
        .and_then(|rest| rest.strip_suffix('/'))
        .map(str::to_string)
        .unwrap_or_else(|| base_path.to_string())
}

fn endpoint_type(api: &ApiDescriptor) -> String {
    [&api.endpoint_protocol, &api.multi_endpoints.protocol]
        .into_iter()
        .find(|protocol| !protocol.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_ENDPOINT_PROTOCOL.to_string())
}

fn stage_url(descriptor: Option<&EndpointDescriptor>) -> Option<EndpointUrl> {
    descriptor
        .filter(|d| !d.url.is_empty())
        .map(|d| EndpointUrl { url: d.url.clone() })
}

fn security_document(security: &EndpointSecurity) -> SecurityDocument {
    SecurityDocument {
        enabled: security.enabled,
        security_type: non_empty_or(&security.security_type, DEFAULT_SECURITY_TYPE),
        username: security.basic_username.clone(),
        password: security.basic_password.clone(),
        api_key_identifier: security.api_key_name.clone(),
        api_key_value: security.api_key_value.clone(),
        api_key_identifier_type: non_empty_or(&security.api_key_in, DEFAULT_API_KEY_PLACEMENT)
            .to_uppercase(),
        additional_properties: Default::default(),
        custom_parameters: Default::default(),
        connection_timeout_duration: UNSET_TIMEOUT,
        socket_timeout_duration: UNSET_TIMEOUT,
        connection_request_timeout_duration: UNSET_TIMEOUT,
    }
}

fn stage_security_document(security: &EndpointSecurity) -> StageSecurityDocument {
    StageSecurityDocument {
        enabled: security.enabled,
        security_type: non_empty_or(&security.security_type, DEFAULT_SECURITY_TYPE),
        api_key_identifier: security.api_key_name.clone(),
        api_key_value: security.api_key_value.clone(),
        api_key_identifier_type: non_empty_or(&security.api_key_in, DEFAULT_API_KEY_PLACEMENT)
            .to_uppercase(),
        username: security.basic_username.clone(),
        custom_parameters: "{}".to_string(),
        connection_timeout_duration: UNSET_TIMEOUT,
        connection_request_timeout_duration: UNSET_TIMEOUT,
        socket_timeout_duration: UNSET_TIMEOUT,
        grant_type: String::new(),
        token_url: String::new(),
        proxy_configs: ProxyConfigs::default(),
    }
}

fn endpoint_document(descriptor: &EndpointDescriptor) -> EndpointDocument {
    let url = Some(EndpointUrl {
        url: descriptor.url.clone(),
    });
    let security = Some(stage_security_document(&descriptor.security));
    let (production_endpoints, sandbox_endpoints, production, sandbox) = match descriptor.stage {
        DeploymentStage::Production => (url, None, security, None),
        DeploymentStage::Sandbox => (None, url, None, security),
    };

    EndpointDocument {
        id: descriptor.id.clone(),
        name: descriptor.name.clone(),
        deployment_stage: descriptor.stage,
        endpoint_config: EndpointConfig {
            endpoint_type: descriptor.protocol.clone(),
            production_endpoints,
            sandbox_endpoints,
            endpoint_security: EndpointSecurityConfig {
                production,
                sandbox,
                custom_parameters: Some("null".to_string()),
            },
        },
    }
}

fn subtype_configuration(api: &ApiDescriptor) -> Option<SubtypeConfiguration> {
    if api.api_sub_type.is_empty() || !api.ai_configuration.is_complete() {
        return None;
    }
    Some(SubtypeConfiguration {
        subtype: api.api_sub_type.clone(),
        configuration: serde_json::json!({
            "llmProviderId": api.ai_configuration.llm_provider_id,
        })
        .to_string(),
    })
}

fn max_tps(production: Option<&AiRateLimit>, sandbox: Option<&AiRateLimit>) -> Option<MaxTps> {
    if production.is_none() && sandbox.is_none() {
        return None;
    }

    let tokens = TokenThrottlingConfig {
        production_max_prompt_token_count: production.and_then(|l| l.prompt_token_count),
        production_max_completion_token_count: production.and_then(|l| l.completion_token_count),
        production_max_total_token_count: production.and_then(|l| l.total_token_count),
        sandbox_max_prompt_token_count: sandbox.and_then(|l| l.prompt_token_count),
        sandbox_max_completion_token_count: sandbox.and_then(|l| l.completion_token_count),
        sandbox_max_total_token_count: sandbox.and_then(|l| l.total_token_count),
        is_token_based_throttling_enabled: true,
    };
    let has_token_limits = [
        tokens.production_max_prompt_token_count,
        tokens.production_max_completion_token_count,
        tokens.production_max_total_token_count,
        tokens.sandbox_max_prompt_token_count,
        tokens.sandbox_max_completion_token_count,
        tokens.sandbox_max_total_token_count,
    ]
    .iter()
    .any(Option::is_some);

    Some(MaxTps {
        production: production.map(|l| l.request_count),
        production_time_unit: production.map(|l| l.time_unit.to_uppercase()),
        sandbox: sandbox.map(|l| l.request_count),
        sandbox_time_unit: sandbox.map(|l| l.time_unit.to_uppercase()),
        token_based_throttling_configuration: has_token_limits.then_some(tokens),
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
