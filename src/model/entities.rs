use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use crate::model::null_as_default;

/// Control-plane entity held in the mirror store
pub trait MirroredEntity: Clone + Send + Sync {
    type Key: Eq + Hash + Ord + Clone + Send + Sync;

    /// Natural identifier the entity is keyed by
    fn key(&self) -> Self::Key;

    /// Fill in the tenant domain when the control plane left it empty
    fn backfill_tenant(&mut self, _tenant_domain: &str) {}
}

/// `{ "list": [...] }` envelope used for snapshots and listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityList<T> {
    #[serde(
        default = "Vec::new",
        deserialize_with = "null_as_default",
        bound(deserialize = "T: Deserialize<'de>")
    )]
    pub list: Vec<T>,
}

impl<T> EntityList<T> {
    pub fn new(list: Vec<T>) -> Self {
        Self { list }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub uuid: String,
    pub id: i32,
    pub name: String,
    #[serde(rename = "subName")]
    pub sub_name: String,
    pub policy: String,
    #[serde(rename = "tokenType")]
    pub token_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: HashMap<String, String>,
    #[serde(rename = "tenanId", skip_serializing_if = "is_zero")]
    pub tenant_id: i32,
    #[serde(rename = "tenanDomain", alias = "tenantDomain", skip_serializing_if = "String::is_empty")]
    pub tenant_domain: String,
    #[serde(rename = "timeStamp", skip_serializing_if = "is_zero_i64")]
    pub time_stamp: i64,
}

impl MirroredEntity for Application {
    type Key = String;

    fn key(&self) -> String {
        self.uuid.clone()
    }

    fn backfill_tenant(&mut self, tenant_domain: &str) {
        if self.tenant_domain.is_empty() {
            self.tenant_domain = tenant_domain.to_string();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    pub subscription_id: i32,
    #[serde(rename = "subscriptionUUID")]
    pub subscription_uuid: String,
    pub policy_id: String,
    pub api_id: i32,
    #[serde(rename = "apiUUID")]
    pub api_uuid: String,
    pub app_id: i32,
    #[serde(rename = "applicationUUID")]
    pub application_uuid: String,
    pub subscription_state: String,
    #[serde(rename = "tenanId", skip_serializing_if = "is_zero")]
    pub tenant_id: i32,
    #[serde(rename = "tenanDomain", alias = "tenantDomain", skip_serializing_if = "String::is_empty")]
    pub tenant_domain: String,
    #[serde(skip_serializing_if = "is_zero_i64")]
    pub time_stamp: i64,
}

impl MirroredEntity for Subscription {
    type Key = i32;

    fn key(&self) -> i32 {
        self.subscription_id
    }

    fn backfill_tenant(&mut self, tenant_domain: &str) {
        if self.tenant_domain.is_empty() {
            self.tenant_domain = tenant_domain.to_string();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationKeyMapping {
    pub application_id: i32,
    #[serde(rename = "applicationUUID")]
    pub application_uuid: String,
    pub consumer_key: String,
    pub key_type: String,
    pub key_manager: String,
    #[serde(rename = "tenanId", skip_serializing_if = "is_zero")]
    pub tenant_id: i32,
    #[serde(rename = "tenanDomain", alias = "tenantDomain", skip_serializing_if = "String::is_empty")]
    pub tenant_domain: String,
    #[serde(skip_serializing_if = "is_zero_i64")]
    pub time_stamp: i64,
}

impl ApplicationKeyMapping {
    /// Unique reference of a key mapping: `consumerKey:keyManager`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.consumer_key, self.key_manager)
    }
}

impl MirroredEntity for ApplicationKeyMapping {
    type Key = String;

    fn key(&self) -> String {
        self.reference()
    }

    fn backfill_tenant(&mut self, tenant_domain: &str) {
        if self.tenant_domain.is_empty() {
            self.tenant_domain = tenant_domain.to_string();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyManager {
    pub name: String,
    pub enabled: bool,
    pub issuer: String,
    pub certificate: String,
}

impl MirroredEntity for KeyManager {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}
