use crate::logic::endpoints::ResolvedEndpoints;
use crate::model::{
    DeclaredOperation, HeaderModifier, ModelBasedRoundRobin, ModelEndpointWeight,
    ModelRoutingConfig, ModelWeight, OperationFilter, OperationPolicies, OperationPolicy,
    PolicyParameters, POLICY_ADD_HEADER, POLICY_MIRROR_REQUEST,
    POLICY_MODEL_WEIGHTED_ROUND_ROBIN, POLICY_REDIRECT_REQUEST, POLICY_REMOVE_HEADER,
    POLICY_TYPE_COMMON, POLICY_VERSION_V1,
};

/// Translates declarative filters into operation policies
pub struct PolicyBuilder<'a> {
    endpoints: &'a ResolvedEndpoints,
}

impl<'a> PolicyBuilder<'a> {
    pub fn new(endpoints: &'a ResolvedEndpoints) -> Self {
        Self { endpoints }
    }

    /// Policies attached to one declared operation: model routing first,
    /// then filters in declaration order.
    pub fn operation_policies(&self, operation: &DeclaredOperation) -> OperationPolicies {
        let mut policies = OperationPolicies::default();
        if let Some(routing) = &operation.ai_model_based_round_robin {
            policies.request.push(self.model_routing(routing, None));
        }
        for filter in &operation.filters {
            self.apply_filter(filter, &mut policies);
        }
        policies
    }

    /// API-level routing policy, typed `common`
    pub fn api_policies(&self, routing: Option<&ModelBasedRoundRobin>) -> OperationPolicies {
        let mut policies = OperationPolicies::default();
        if let Some(routing) = routing {
            policies
                .request
                .push(self.model_routing(routing, Some(POLICY_TYPE_COMMON)));
        }
        policies
    }

    pub fn apply_filter(&self, filter: &OperationFilter, policies: &mut OperationPolicies) {
        match filter {
            OperationFilter::Headers {
                request_headers,
                response_headers,
            } => {
                header_policies(request_headers, &mut policies.request);
                header_policies(response_headers, &mut policies.response);
            }
            OperationFilter::MirrorRequest { urls } => {
                log::debug!("Processing request filter for request mirroring");
                policies.request.extend(urls.iter().map(|url| {
                    policy(
                        POLICY_MIRROR_REQUEST,
                        PolicyParameters::Mirror { url: url.clone() },
                    )
                }));
            }
            OperationFilter::RedirectRequest { url } => {
                log::debug!("Processing request filter for request redirection");
                policies.request.push(policy(
                    POLICY_REDIRECT_REQUEST,
                    PolicyParameters::Redirect { url: url.clone() },
                ));
            }
        }
    }

    pub fn model_routing(
        &self,
        routing: &ModelBasedRoundRobin,
        policy_type: Option<&str>,
    ) -> OperationPolicy {
        let config = ModelRoutingConfig {
            production: self.bind_weights(&routing.production_models),
            sandbox: self.bind_weights(&routing.sandbox_models),
            suspend_duration: routing.on_quota_exceed_suspend_duration.to_string(),
        };
        OperationPolicy {
            policy_type: policy_type.map(str::to_string),
            ..policy(
                POLICY_MODEL_WEIGHTED_ROUND_ROBIN,
                PolicyParameters::WeightedRouting(config),
            )
        }
    }

    /// Bind each weight to the endpoint whose URL it names. Unknown URLs
    /// bind to an empty identifier.
    fn bind_weights(&self, weights: &[ModelWeight]) -> Vec<ModelEndpointWeight> {
        weights
            .iter()
            .map(|weight| {
                let endpoint_id = self.endpoints.id_for_url(&weight.endpoint).unwrap_or_default();
                if endpoint_id.is_empty() {
                    log::warn!(
                        "No resolved endpoint matches model weight endpoint {} (model {})",
                        weight.endpoint,
                        weight.model
                    );
                }
                ModelEndpointWeight {
                    model: weight.model.clone(),
                    endpoint_id: endpoint_id.to_string(),
                    weight: weight.weight,
                }
            })
            .collect()
    }
}

fn header_policies(modifier: &HeaderModifier, into: &mut Vec<OperationPolicy>) {
    into.extend(modifier.add_headers.iter().map(|header| {
        policy(
            POLICY_ADD_HEADER,
            PolicyParameters::Header {
                name: header.name.clone(),
                value: Some(header.value.clone()),
            },
        )
    }));
    into.extend(modifier.remove_headers.iter().map(|name| {
        policy(
            POLICY_REMOVE_HEADER,
            PolicyParameters::Header {
                name: name.clone(),
                value: None,
            },
        )
    }));
}

fn policy(name: &str, parameters: PolicyParameters) -> OperationPolicy {
    OperationPolicy {
        policy_name: name.to_string(),
        policy_version: POLICY_VERSION_V1.to_string(),
        policy_id: None,
        policy_type: None,
        parameters,
    }
}
