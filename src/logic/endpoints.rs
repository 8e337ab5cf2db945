use crate::model::{
    generate_endpoint_id, ApiDescriptor, DeploymentStage, EndpointEntry, EndpointSecurity, Id,
};

const DEFAULT_PROTOCOL: &str = "https";

/// A backend endpoint resolved from an event, with a stable identifier
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    pub id: Id,
    pub name: String,
    pub stage: DeploymentStage,
    pub protocol: String,
    /// `<protocol>://<address>`, empty when the event gave no address
    pub url: String,
    pub security: EndpointSecurity,
}

/// All endpoints of one API, in declaration order (production first)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedEndpoints {
    pub descriptors: Vec<EndpointDescriptor>,
}

impl ResolvedEndpoints {
    /// First endpoint declared for the stage
    pub fn primary(&self, stage: DeploymentStage) -> Option<&EndpointDescriptor> {
        self.descriptors.iter().find(|d| d.stage == stage)
    }

    pub fn count(&self, stage: DeploymentStage) -> usize {
        self.descriptors.iter().filter(|d| d.stage == stage).count()
    }

    /// Whether a separate endpoint document is needed
    pub fn is_multi_endpoint(&self) -> bool {
        self.count(DeploymentStage::Production) > 1 || self.count(DeploymentStage::Sandbox) > 1
    }

    /// Identifier of the first endpoint whose URL equals `url`
    pub fn id_for_url(&self, url: &str) -> Option<&str> {
        self.descriptors
            .iter()
            .find(|d| !d.url.is_empty() && d.url == url)
            .map(|d| d.id.as_str())
    }
}

pub struct EndpointResolver;

impl EndpointResolver {
    /// Expand the event's endpoint configuration into descriptors.
    ///
    /// A stage with multi-endpoint entries uses those; otherwise it falls
    /// back to the single endpoint field for that stage, if set.
    pub fn resolve(api: &ApiDescriptor) -> ResolvedEndpoints {
        let identity = api.identity();
        let multi = &api.multi_endpoints;
        let multi_protocol = first_non_empty(&[&multi.protocol, &api.endpoint_protocol]);
        let single_protocol = first_non_empty(&[&api.endpoint_protocol, &multi.protocol]);

        let mut descriptors = Vec::new();
        for (stage, entries, single, single_security) in [
            (
                DeploymentStage::Production,
                &multi.prod_endpoints,
                &api.prod_endpoint,
                &api.prod_endpoint_security,
            ),
            (
                DeploymentStage::Sandbox,
                &multi.sand_endpoints,
                &api.sand_endpoint,
                &api.sand_endpoint_security,
            ),
        ] {
            if !entries.is_empty() {
                descriptors.extend(Self::expand(&identity, stage, multi_protocol, entries));
            } else if !single.is_empty() {
                let url = render_url(single_protocol, single);
                descriptors.push(EndpointDescriptor {
                    id: generate_endpoint_id(&identity, stage, 0, &url),
                    name: endpoint_name(stage, 0),
                    stage,
                    protocol: single_protocol.to_string(),
                    url,
                    security: single_security.clone(),
                });
            }
        }

        log::debug!(
            "Resolved {} production and {} sandbox endpoints for API {}",
            descriptors.iter().filter(|d| d.stage == DeploymentStage::Production).count(),
            descriptors.iter().filter(|d| d.stage == DeploymentStage::Sandbox).count(),
            identity
        );

        ResolvedEndpoints { descriptors }
    }

    fn expand<'a>(
        identity: &'a str,
        stage: DeploymentStage,
        protocol: &'a str,
        entries: &'a [EndpointEntry],
    ) -> impl Iterator<Item = EndpointDescriptor> + 'a {
        entries.iter().enumerate().map(move |(position, entry)| {
            let url = render_url(protocol, &entry.url);
            EndpointDescriptor {
                id: generate_endpoint_id(identity, stage, position, &url),
                name: endpoint_name(stage, position),
                stage,
                protocol: protocol.to_string(),
                url,
                security: entry.security.clone(),
            }
        })
    }
}

/// `Default Production Endpoint`, `2 Production Endpoint`, ...
fn endpoint_name(stage: DeploymentStage, position: usize) -> String {
    if position == 0 {
        format!("Default {} Endpoint", stage.display_name())
    } else {
        format!("{} {} Endpoint", position + 1, stage.display_name())
    }
}

fn render_url(protocol: &str, address: &str) -> String {
    if address.is_empty() {
        String::new()
    } else {
        format!("{}://{}", protocol, address)
    }
}

fn first_non_empty<'a>(candidates: &[&'a String]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|c| !c.is_empty())
        .map(String::as_str)
        .unwrap_or(DEFAULT_PROTOCOL)
}
