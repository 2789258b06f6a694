//! Per-origin connection grants
//!
//! Explicit process-wide state: created empty, cleared by user revocation or
//! wallet lock. An origin with no record is disconnected; there is no partial
//! scope.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::types::OriginGrant;

#[derive(Default)]
pub struct PermissionStore {
    grants: Mutex<HashMap<String, OriginGrant>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self, origin: &str) -> bool {
        self.grants.lock().unwrap().contains_key(origin)
    }

    pub fn grant(&self, origin: &str, addresses: Vec<String>) {
        log::info!("Granting connection to origin: {}", origin);
        self.grants.lock().unwrap().insert(
            origin.to_string(),
            OriginGrant { addresses, granted_at: Utc::now() },
        );
    }

    /// Revocation is immediate and total. Returns whether a grant existed.
    pub fn revoke(&self, origin: &str) -> bool {
        let removed = self.grants.lock().unwrap().remove(origin).is_some();
        if removed {
            log::info!("Revoked connection for origin: {}", origin);
        }
        removed
    }

    /// Addresses visible to a connected origin, in grant order. Empty when
    /// disconnected.
    pub fn connected_addresses(&self, origin: &str) -> Vec<String> {
        self.grants
            .lock()
            .unwrap()
            .get(origin)
            .map(|g| g.addresses.clone())
            .unwrap_or_default()
    }

    /// Wallet lock tears down every grant.
    pub fn clear_all(&self) -> usize {
        let mut grants = self.grants.lock().unwrap();
        let count = grants.len();
        grants.clear();
        if count > 0 {
            log::info!("Cleared {} origin grant(s)", count);
        }
        count
    }

    /// Origins currently holding a grant.
    pub fn connected_origins(&self) -> Vec<String> {
        self.grants.lock().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_until_granted_and_after_revoke() {
        let store = PermissionStore::new();
        assert!(!store.is_connected("https://dapp.example"));

        store.grant("https://dapp.example", vec!["DTest".into()]);
        assert!(store.is_connected("https://dapp.example"));
        assert_eq!(store.connected_addresses("https://dapp.example"), vec!["DTest".to_string()]);

        assert!(store.revoke("https://dapp.example"));
        assert!(!store.revoke("https://dapp.example"));
        assert!(!store.is_connected("https://dapp.example"));
        assert!(store.connected_addresses("https://dapp.example").is_empty());
    }

    #[test]
    fn clear_all_revokes_everything() {
        let store = PermissionStore::new();
        store.grant("a", vec!["D1".into()]);
        store.grant("b", vec!["D1".into()]);
        assert_eq!(store.clear_all(), 2);
        assert!(!store.is_connected("a"));
        assert!(!store.is_connected("b"));
    }
}
