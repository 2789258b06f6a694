//! Active-account cache
//!
//! Holds the ordered derived address list, the active index, and a cached
//! snapshot (balance, UTXO set, doginal inventory) for the active account.
//! The snapshot is swapped whole under a write lock: readers never observe a
//! balance computed from a mid-refresh UTXO set.

use std::sync::{Arc, RwLock};

use crate::capability::ChainSource;
use crate::error::ProviderError;
use crate::types::{Account, Doginal, OutPoint, Utxo};

struct Inner {
    addresses: Vec<String>,
    active: usize,
    snapshot: Account,
    locked: bool,
}

pub struct AccountState {
    inner: RwLock<Inner>,
}

impl AccountState {
    /// `addresses` is the ordered list of derived addresses; index 0 starts
    /// active with an empty (unfetched) snapshot.
    pub fn new(addresses: Vec<String>) -> Self {
        assert!(!addresses.is_empty(), "wallet has at least one derived address");
        let snapshot = Account { address: addresses[0].clone(), ..Account::default() };
        Self {
            inner: RwLock::new(Inner { addresses, active: 0, snapshot, locked: false }),
        }
    }

    pub fn current_address(&self) -> String {
        self.inner.read().unwrap().snapshot.address.clone()
    }

    pub fn balance(&self) -> u64 {
        self.inner.read().unwrap().snapshot.balance_koinu
    }

    pub fn utxo_set(&self) -> Vec<Utxo> {
        self.inner.read().unwrap().snapshot.utxos.clone()
    }

    pub fn doginals(&self) -> Vec<Doginal> {
        self.inner.read().unwrap().snapshot.doginals.clone()
    }

    pub fn snapshot(&self) -> Account {
        self.inner.read().unwrap().snapshot.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.read().unwrap().locked
    }

    pub fn set_locked(&self, locked: bool) {
        self.inner.write().unwrap().locked = locked;
    }

    pub fn account_count(&self) -> usize {
        self.inner.read().unwrap().addresses.len()
    }

    /// Index of the active account in the derived address list.
    pub fn active_index(&self) -> usize {
        self.inner.read().unwrap().active
    }

    /// Pull a fresh snapshot from the network collaborator.
    ///
    /// All three fetches complete before the swap, so the update is atomic
    /// with respect to readers. A refresh raced by `switch_active` is
    /// discarded rather than applied to the wrong account.
    pub async fn refresh(&self, chain: &Arc<dyn ChainSource>) -> Result<(), ProviderError> {
        let address = self.current_address();

        let balance_koinu = chain.fetch_balance(&address).await?;
        let mut utxos = chain.fetch_utxos(&address).await?;
        let doginals = chain.fetch_doginals(&address).await?;

        // Mark outputs the indexer knows to carry inscriptions.
        for utxo in &mut utxos {
            if doginals.iter().any(|d| d.outpoint == utxo.outpoint) {
                utxo.inscribed = true;
            }
        }

        let mut inner = self.inner.write().unwrap();
        if inner.snapshot.address != address {
            log::debug!("Discarding stale refresh for {}", address);
            return Ok(());
        }
        log::debug!(
            "Refreshed {}: {} koinu, {} utxos, {} doginals",
            address,
            balance_koinu,
            utxos.len(),
            doginals.len()
        );
        inner.snapshot = Account { address, balance_koinu, utxos, doginals };
        Ok(())
    }

    /// Push-style update from the collaborator; same atomic swap as a pull.
    pub fn apply_update(&self, account: Account) {
        let mut inner = self.inner.write().unwrap();
        if inner.snapshot.address == account.address {
            inner.snapshot = account;
        }
    }

    /// Switch the active account. Invalidates all caches atomically; the new
    /// snapshot is empty until the next refresh. Returns the new address.
    pub fn switch_active(&self, index: usize) -> Result<String, ProviderError> {
        let mut inner = self.inner.write().unwrap();
        let address = inner
            .addresses
            .get(index)
            .cloned()
            .ok_or_else(|| ProviderError::InvalidParams(format!("No account at index {}", index)))?;
        inner.active = index;
        inner.snapshot = Account { address: address.clone(), ..Account::default() };
        log::info!("Switched active account to index {} ({})", index, address);
        Ok(address)
    }

    /// Optimistically drop broadcast-consumed UTXOs so a rapid second request
    /// cannot double-spend them. Reconciled on the next refresh.
    pub fn mark_spent(&self, spent: &[OutPoint]) {
        let mut inner = self.inner.write().unwrap();
        let before: u64 = inner.snapshot.utxos.iter().map(|u| u.value_koinu).sum();
        inner.snapshot.utxos.retain(|u| !spent.contains(&u.outpoint));
        let after: u64 = inner.snapshot.utxos.iter().map(|u| u.value_koinu).sum();
        inner.snapshot.balance_koinu = inner.snapshot.balance_koinu.saturating_sub(before - after);
        inner.snapshot.doginals.retain(|d| !spent.contains(&d.outpoint));
    }
}
