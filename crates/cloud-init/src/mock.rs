//! Mock SecretSource for unit testing
//!
//! Stores Secrets in memory and records every lookup, so tests can assert
//! which Secrets the resolver asked for.

use crate::error::ResolveError;
use crate::source::SecretSource;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// In-memory Secret store
#[derive(Clone, Debug, Default)]
pub struct MockSecretSource {
    secrets: Arc<Mutex<HashMap<(String, String), Secret>>>,
    lookups: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSecretSource {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a Secret under its metadata namespace and name
    pub fn add_secret(&self, secret: Secret) {
        let key = (
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        self.secrets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, secret);
    }

    /// Store a Secret with the given `data` entries
    pub fn add_secret_data(&self, namespace: &str, name: &str, data: &[(&str, &[u8])]) {
        let data: BTreeMap<String, ByteString> = data
            .iter()
            .map(|(key, value)| ((*key).to_string(), ByteString(value.to_vec())))
            .collect();
        self.add_secret(Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        });
    }

    /// Every `(namespace, name)` looked up so far
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl SecretSource for MockSecretSource {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ResolveError> {
        let key = (namespace.to_string(), name.to_string());
        self.lookups
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(key.clone());
        Ok(self
            .secrets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key)
            .cloned())
    }
}
