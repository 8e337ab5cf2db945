use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::model::{Application, ApplicationKeyMapping, KeyManager, MirroredEntity, Subscription};

/// In-memory mirror of control-plane entities.
///
/// Each map is only ever replaced as a whole. The replacement map is built
/// before the write lock is taken, so readers see either the previous
/// snapshot or the new one.
#[derive(Debug)]
pub struct EntityMirrorStore {
    tenant_domain: String,
    applications: RwLock<HashMap<String, Application>>,
    subscriptions: RwLock<HashMap<i32, Subscription>>,
    key_mappings: RwLock<HashMap<String, ApplicationKeyMapping>>,
    key_managers: RwLock<HashMap<String, KeyManager>>,
}

impl EntityMirrorStore {
    /// Create an empty store. `tenant_domain` is applied to entities that
    /// arrive without one.
    pub fn new(tenant_domain: impl Into<String>) -> Self {
        Self {
            tenant_domain: tenant_domain.into(),
            applications: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            key_mappings: RwLock::new(HashMap::new()),
            key_managers: RwLock::new(HashMap::new()),
        }
    }

    pub fn replace_applications(&self, applications: Vec<Application>) -> usize {
        replace(&self.applications, self.marshal(applications))
    }

    pub fn replace_subscriptions(&self, subscriptions: Vec<Subscription>) -> usize {
        replace(&self.subscriptions, self.marshal(subscriptions))
    }

    pub fn replace_key_mappings(&self, key_mappings: Vec<ApplicationKeyMapping>) -> usize {
        replace(&self.key_mappings, self.marshal(key_mappings))
    }

    pub fn replace_key_managers(&self, key_managers: Vec<KeyManager>) -> usize {
        replace(&self.key_managers, self.marshal(key_managers))
    }

    pub fn get_application(&self, uuid: &str) -> Option<Application> {
        self.applications.read().get(uuid).cloned()
    }

    pub fn get_subscription(&self, subscription_id: i32) -> Option<Subscription> {
        self.subscriptions.read().get(&subscription_id).cloned()
    }

    /// Look up a key mapping by its `consumerKey:keyManager` reference
    pub fn get_key_mapping(&self, reference: &str) -> Option<ApplicationKeyMapping> {
        self.key_mappings.read().get(reference).cloned()
    }

    pub fn get_key_manager(&self, name: &str) -> Option<KeyManager> {
        self.key_managers.read().get(name).cloned()
    }

    pub fn list_applications(&self) -> Vec<Application> {
        list(&self.applications)
    }

    pub fn list_subscriptions(&self) -> Vec<Subscription> {
        list(&self.subscriptions)
    }

    pub fn list_key_mappings(&self) -> Vec<ApplicationKeyMapping> {
        list(&self.key_mappings)
    }

    pub fn list_key_managers(&self) -> Vec<KeyManager> {
        list(&self.key_managers)
    }

    /// Key a snapshot by natural identifier, backfilling the tenant domain.
    /// A later duplicate in the snapshot wins.
    fn marshal<E: MirroredEntity>(&self, entries: Vec<E>) -> HashMap<E::Key, E> {
        entries
            .into_iter()
            .map(|mut entry| {
                entry.backfill_tenant(&self.tenant_domain);
                (entry.key(), entry)
            })
            .collect()
    }
}

fn replace<K, V>(slot: &RwLock<HashMap<K, V>>, snapshot: HashMap<K, V>) -> usize {
    let count = snapshot.len();
    *slot.write() = snapshot;
    count
}

fn list<E: MirroredEntity>(slot: &RwLock<HashMap<E::Key, E>>) -> Vec<E> {
    slot.read()
        .iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, entry)| entry.clone())
        .collect()
}
