use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use crate::logic::endpoints::ResolvedEndpoints;
use crate::logic::policies::PolicyBuilder;
use crate::model::{
    ApiOperation, DeclaredOperation, OperationPolicies, ScopeWrapper, DEFAULT_AUTHORIZATION_URL,
    DEFAULT_AUTH_TYPE, DEFAULT_SECURITY_SCHEME, PATH_PARAM_PLACEHOLDER, UNLIMITED_TIER,
};

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Operations and scopes produced by matching a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedOperations {
    pub operations: Vec<ApiOperation>,
    /// Deduplicated by name, sorted by name
    pub scopes: Vec<ScopeWrapper>,
}

static PATH_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]+\}").expect("path parameter pattern is valid"));

/// Replace every `{param}` segment with the fixed placeholder.
///
/// `/pets/{petId}/tags/{tag}` becomes `/pets/hardcode/tags/hardcode`.
pub fn normalize_path(path: &str) -> String {
    PATH_PARAMETER
        .replace_all(path, PATH_PARAM_PLACEHOLDER)
        .into_owned()
}

struct CompiledOperation<'a> {
    pattern: Option<Regex>,
    operation: &'a DeclaredOperation,
}

/// Aligns declared operations with the operations of an OpenAPI document
pub struct OperationMatcher<'a> {
    declared: Vec<CompiledOperation<'a>>,
    policies: PolicyBuilder<'a>,
}

impl<'a> OperationMatcher<'a> {
    pub fn new(declared: &'a [DeclaredOperation], endpoints: &'a ResolvedEndpoints) -> Self {
        let declared = declared
            .iter()
            .map(|operation| {
                // Unanchored: `/pets` also claims `/pets/hardcode`
                let pattern = match Regex::new(&operation.path) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        log::error!("Invalid operation path pattern {}: {}", operation.path, e);
                        None
                    }
                };
                CompiledOperation { pattern, operation }
            })
            .collect();

        Self {
            declared,
            policies: PolicyBuilder::new(endpoints),
        }
    }

    /// First declared operation, in declaration order, matching the schema
    /// path and verb.
    pub fn find(&self, schema_path: &str, verb: &str) -> Option<&'a DeclaredOperation> {
        let normalized = normalize_path(schema_path);
        self.declared
            .iter()
            .find(|compiled| {
                compiled.operation.verb.eq_ignore_ascii_case(verb)
                    && compiled
                        .pattern
                        .as_ref()
                        .is_some_and(|pattern| pattern.is_match(&normalized))
            })
            .map(|compiled| compiled.operation)
    }

    /// Walk the schema's paths in document order, annotate every matched
    /// operation in place and collect the API operations and scopes.
    pub fn annotate(&self, schema: &mut Value) -> MatchedOperations {
        let Some(paths) = schema.get_mut("paths").and_then(Value::as_mapping_mut) else {
            log::debug!("Schema has no paths section, no operations matched");
            return MatchedOperations::default();
        };

        let mut operations = Vec::new();
        let mut scopes = BTreeMap::new();

        for (path, item) in paths.iter_mut() {
            let (Some(path), Some(item)) = (path.as_str(), item.as_mapping_mut()) else {
                continue;
            };
            for (verb, content) in item.iter_mut() {
                let Some(verb) = verb.as_str() else {
                    continue;
                };
                if !HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(verb)) {
                    continue;
                }
                let Some(declared) = self.find(path, verb) else {
                    log::debug!("No declared operation for {} {}", verb, path);
                    continue;
                };

                if let Some(content) = content.as_mapping_mut() {
                    annotate_operation(content, &declared.scopes);
                }
                for scope in &declared.scopes {
                    scopes
                        .entry(scope.clone())
                        .or_insert_with(|| ScopeWrapper::named(scope));
                }

                operations.push(api_operation(
                    path,
                    &verb.to_uppercase(),
                    declared.scopes.clone(),
                    self.policies.operation_policies(declared),
                ));
            }
        }

        MatchedOperations {
            operations,
            scopes: scopes.into_values().collect(),
        }
    }

    /// GraphQL operations are taken verbatim from the declaration
    pub fn graphql_operations(&self) -> Vec<ApiOperation> {
        self.declared
            .iter()
            .map(|compiled| {
                let operation = compiled.operation;
                api_operation(
                    &operation.path,
                    &operation.verb,
                    Vec::new(),
                    OperationPolicies::default(),
                )
            })
            .collect()
    }
}

fn api_operation(
    target: &str,
    verb: &str,
    scopes: Vec<String>,
    operation_policies: OperationPolicies,
) -> ApiOperation {
    ApiOperation {
        id: String::new(),
        target: target.to_string(),
        verb: verb.to_string(),
        auth_type: DEFAULT_AUTH_TYPE.to_string(),
        throttling_policy: UNLIMITED_TIER.to_string(),
        scopes,
        used_product_ids: Vec::new(),
        operation_policies,
    }
}

fn annotate_operation(content: &mut Mapping, scopes: &[String]) {
    if !scopes.is_empty() {
        let mut requirement = Mapping::new();
        requirement.insert(
            Value::from(DEFAULT_SECURITY_SCHEME),
            Value::Sequence(scopes.iter().map(|s| Value::from(s.as_str())).collect()),
        );
        content.insert(
            Value::from("security"),
            Value::Sequence(vec![Value::Mapping(requirement)]),
        );
    }
    content.insert(Value::from("x-auth-type"), Value::from(DEFAULT_AUTH_TYPE));
}

/// Add the `default` OAuth2 scheme binding every collected scope to
/// `components.securitySchemes`, creating the sections when missing.
pub fn inject_security_scheme(schema: &mut Value, scopes: &[ScopeWrapper]) {
    let Some(root) = schema.as_mapping_mut() else {
        return;
    };

    let bindings: Mapping = scopes
        .iter()
        .map(|wrapper| (Value::from(wrapper.scope.name.as_str()), Value::from("")))
        .collect();

    let mut implicit = Mapping::new();
    implicit.insert("authorizationUrl".into(), DEFAULT_AUTHORIZATION_URL.into());
    implicit.insert("scopes".into(), Value::Mapping(bindings.clone()));
    implicit.insert("x-scopes-bindings".into(), Value::Mapping(bindings));

    let mut flows = Mapping::new();
    flows.insert("implicit".into(), Value::Mapping(implicit));

    let mut scheme = Mapping::new();
    scheme.insert("type".into(), "oauth2".into());
    scheme.insert("flows".into(), Value::Mapping(flows));

    let mut components = take_mapping(root, "components");
    let mut schemes = take_mapping(&mut components, "securitySchemes");
    schemes.insert(DEFAULT_SECURITY_SCHEME.into(), Value::Mapping(scheme));
    components.insert("securitySchemes".into(), Value::Mapping(schemes));
    root.insert("components".into(), Value::Mapping(components));
}

/// Detach the mapping under `key`, or a fresh one when it is missing or
/// not a mapping. Put it back with `insert` to keep its position.
fn take_mapping(parent: &mut Mapping, key: &str) -> Mapping {
    match parent
        .get_mut(key)
        .map(|slot| std::mem::replace(slot, Value::Null))
    {
        Some(Value::Mapping(mapping)) => mapping,
        _ => Mapping::new(),
    }
}
