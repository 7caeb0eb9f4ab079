// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Manager
//!
//! Governs how the ledger is persisted in the primary slot:
//!
//! | Status     | Slot content  | Session key      |
//! |------------|---------------|------------------|
//! | `Disabled` | `AppState`    | none             |
//! | `Locked`   | `VaultRecord` | none             |
//! | `Unlocked` | `VaultRecord` | held by caller   |
//!
//! The manager never holds the session key. Callers receive it from
//! [`VaultManager::enable`] / [`VaultManager::unlock`] and pass it back into
//! [`VaultManager::load`], [`VaultManager::save`] and
//! [`VaultManager::disable`]; dropping it is the `lock` transition.
//!
//! Every write serializes the complete record before touching the slot, so a
//! failed derivation or encryption never leaves a partial record behind.
//!
//! A manager built with [`VaultManager::detached`] has no backend: reads come
//! back empty and writes are no-ops.

use tokio::sync::broadcast;

use crate::crypto::{self, KdfParams, SessionKey, DEFAULT_ITERATIONS};
use crate::error::{VaultError, VaultResult};
use crate::models::AppState;
use crate::notify::{ChangeNotifier, StorageChange};
use crate::storage::{
    read_legacy_transactions, SlotStore, StorageRecord, VaultRecord, APP_STATE_SLOT,
    LEGACY_TRANSACTIONS_SLOT,
};

/// Observable vault status for a given session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    /// No passphrase; the ledger is stored as plaintext.
    Disabled,
    /// Vault enabled, no live key.
    Locked,
    /// Vault enabled, key held in memory.
    Unlocked,
}

/// Persists `AppState` through the slot store, encrypting when a vault is on.
#[derive(Debug)]
pub struct VaultManager<S> {
    store: Option<S>,
    notifier: ChangeNotifier,
    iterations: u32,
}

impl<S: SlotStore> VaultManager<S> {
    /// Create a manager over `store` with the default KDF iteration count.
    pub fn new(store: S) -> Self {
        Self {
            store: Some(store),
            notifier: ChangeNotifier::new(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Create a manager with no storage backend.
    pub fn detached() -> Self {
        Self {
            store: None,
            notifier: ChangeNotifier::new(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Override the iteration count used for newly enabled vaults.
    ///
    /// Existing records keep the count stored in their KDF parameters.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// PBKDF2 iteration count that `enable` writes into new vault records.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The backing store, if any.
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Subscribe to change notifications for the primary slot.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.notifier.subscribe()
    }

    // ========== Internal Helpers ==========

    fn read_record(&self) -> VaultResult<Option<StorageRecord>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.get(APP_STATE_SLOT)? {
            Some(raw) => Ok(Some(StorageRecord::parse(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_primary(&self, text: &str, change: StorageChange) -> VaultResult<()> {
        let Some(store) = &self.store else {
            tracing::debug!(?change, "No storage backend, write skipped");
            return Ok(());
        };
        store.set(APP_STATE_SLOT, text)?;
        self.notifier.notify(change);
        Ok(())
    }

    // ========== Status ==========

    /// Whether the primary slot currently holds a vault record.
    ///
    /// A vault record with malformed fields still counts as enabled. Read
    /// failures and non-JSON text count as "not enabled".
    pub fn is_vault_enabled(&self) -> bool {
        match self.read_record() {
            Ok(record) => record.is_some_and(|r| r.is_vault()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read vault status");
                false
            }
        }
    }

    /// Status as seen by a session holding `key`.
    pub fn status(&self, key: Option<&SessionKey>) -> VaultStatus {
        match (self.is_vault_enabled(), key) {
            (false, _) => VaultStatus::Disabled,
            (true, None) => VaultStatus::Locked,
            (true, Some(_)) => VaultStatus::Unlocked,
        }
    }

    // ========== Load / Save ==========

    /// Load the ledger.
    ///
    /// Returns `Ok(None)` when a vault is enabled but no key was supplied
    /// (the caller must unlock), and when nothing is stored at all. An empty
    /// primary slot falls back to the legacy slot, yielding the migrated
    /// state only if it is non-empty.
    pub fn load(&self, key: Option<&SessionKey>) -> VaultResult<Option<AppState>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let record = match self.read_record() {
            Ok(record) => record,
            Err(VaultError::InvalidFormat(reason)) => {
                tracing::warn!(%reason, "Failed to parse stored app state");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match record {
            None => {
                let legacy = read_legacy_transactions(store)?;
                if legacy.is_empty() {
                    return Ok(None);
                }
                tracing::info!(
                    count = legacy.len(),
                    "Migrating transactions from legacy slot"
                );
                Ok(Some(AppState::new(legacy)))
            }
            Some(StorageRecord::Plain(state)) => Ok(Some(state)),
            Some(StorageRecord::Vault(_) | StorageRecord::CorruptVault(_)) if key.is_none() => {
                Ok(None)
            }
            Some(StorageRecord::Vault(record)) => {
                let key = key.ok_or(VaultError::MissingKey)?;
                Ok(Some(record.open(key)?))
            }
            Some(StorageRecord::CorruptVault(reason)) => Err(VaultError::InvalidFormat(reason)),
        }
    }

    /// Persist `state`.
    ///
    /// With a vault enabled the state is re-encrypted under the existing KDF
    /// parameters with a fresh nonce, and `key` is required and must decrypt
    /// the current record. Without a vault `key` is ignored.
    pub fn save(&self, state: &AppState, key: Option<&SessionKey>) -> VaultResult<()> {
        let record = match self.read_record() {
            Ok(record) => record,
            Err(VaultError::InvalidFormat(reason)) => {
                tracing::warn!(%reason, "Overwriting unparseable app state");
                None
            }
            Err(e) => return Err(e),
        };

        let text = match record {
            Some(StorageRecord::Vault(current)) => {
                let key = key.ok_or(VaultError::MissingKey)?;
                // A stale key would otherwise seal the ledger under a key the
                // stored salt can no longer reproduce.
                crypto::decrypt(&current.envelope()?, key)?;
                StorageRecord::Vault(current.reseal(state, key)?).to_json()?
            }
            Some(StorageRecord::CorruptVault(reason)) => {
                tracing::warn!(%reason, "Refusing to overwrite malformed vault record");
                return Err(match key {
                    Some(_) => VaultError::DecryptionError,
                    None => VaultError::MissingKey,
                });
            }
            Some(StorageRecord::Plain(_)) | None => serde_json::to_string(state)?,
        };

        self.write_primary(&text, StorageChange::Saved)
    }

    // ========== Transitions ==========

    /// Turn the vault on, encrypting `state` under a key derived from
    /// `passphrase` with a fresh salt. Removes the legacy slot.
    pub fn enable(&self, passphrase: &str, state: &AppState) -> VaultResult<SessionKey> {
        match self.read_record() {
            Ok(Some(record)) if record.is_vault() => return Err(VaultError::AlreadyEnabled),
            Ok(_) => {}
            Err(VaultError::InvalidFormat(reason)) => {
                tracing::warn!(%reason, "Replacing unparseable app state with vault record");
            }
            Err(e) => return Err(e),
        }

        let kdf = KdfParams::generate(self.iterations());
        let key = crypto::derive_key(passphrase, &kdf.salt, kdf.iterations)?;
        let text = StorageRecord::Vault(VaultRecord::seal(state, &kdf, &key)?).to_json()?;

        self.write_primary(&text, StorageChange::VaultEnabled)?;
        if let Some(store) = &self.store {
            store.remove(LEGACY_TRANSACTIONS_SLOT)?;
        }

        tracing::info!(
            iterations = kdf.iterations,
            transactions = state.transactions.len(),
            "Vault enabled"
        );
        Ok(key)
    }

    /// Derive a key from `passphrase` and prove it by decrypting the stored
    /// record.
    pub fn unlock(&self, passphrase: &str) -> VaultResult<SessionKey> {
        let record = match self.read_record()? {
            Some(StorageRecord::Vault(record)) => record,
            Some(StorageRecord::CorruptVault(reason)) => {
                return Err(VaultError::InvalidFormat(reason))
            }
            _ => return Err(VaultError::NotEnabled),
        };

        let kdf = record.kdf_params()?;
        let key = crypto::derive_key(passphrase, &kdf.salt, kdf.iterations)?;

        match crypto::decrypt(&record.envelope()?, &key) {
            Ok(_) => {
                tracing::info!("Vault unlocked");
                Ok(key)
            }
            Err(VaultError::DecryptionError) => {
                tracing::warn!("Vault unlock rejected");
                Err(VaultError::InvalidPassphrase)
            }
            Err(e) => Err(e),
        }
    }

    /// Turn the vault off, rewriting the slot as plaintext.
    ///
    /// Returns the recovered state.
    pub fn disable(&self, key: &SessionKey) -> VaultResult<AppState> {
        let record = match self.read_record()? {
            Some(StorageRecord::Vault(record)) => record,
            Some(StorageRecord::CorruptVault(reason)) => {
                return Err(VaultError::InvalidFormat(reason))
            }
            _ => return Err(VaultError::NotEnabled),
        };

        let state = record.open(key)?;
        let text = StorageRecord::Plain(state.clone()).to_json()?;
        self.write_primary(&text, StorageChange::VaultDisabled)?;

        tracing::info!(transactions = state.transactions.len(), "Vault disabled");
        Ok(state)
    }

    // ========== Backup ==========

    /// The primary slot text, verbatim.
    pub fn export_raw(&self) -> VaultResult<Option<String>> {
        match &self.store {
            Some(store) => Ok(store.get(APP_STATE_SLOT)?),
            None => Ok(None),
        }
    }

    /// Replace the primary slot with an exported vault record.
    ///
    /// Only vault records are accepted; a plaintext state would silently
    /// drop encryption. The slot is untouched when validation fails.
    pub fn import_raw(&self, text: &str) -> VaultResult<()> {
        let record = match StorageRecord::parse(text)? {
            StorageRecord::Vault(record) => record,
            StorageRecord::CorruptVault(reason) => return Err(VaultError::InvalidFormat(reason)),
            StorageRecord::Plain(_) => {
                return Err(VaultError::InvalidFormat(
                    "expected a vault record with version, kdf and cipher".to_string(),
                ))
            }
        };
        record.validate()?;

        self.write_primary(text, StorageChange::Imported)?;
        tracing::info!(version = record.version, "Vault record imported");
        Ok(())
    }

    /// Erase the primary and legacy slots.
    pub fn reset(&self) -> VaultResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.remove(APP_STATE_SLOT)?;
        store.remove(LEGACY_TRANSACTIONS_SLOT)?;
        self.notifier.notify(StorageChange::Reset);

        tracing::info!("Storage reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Transaction, TransactionType};
    use crate::storage::MemorySlotStore;
    use serde_json::json;

    const TEST_ITERATIONS: u32 = 1_000;

    fn manager() -> VaultManager<MemorySlotStore> {
        VaultManager::new(MemorySlotStore::new()).with_iterations(TEST_ITERATIONS)
    }

    fn raw(m: &VaultManager<MemorySlotStore>, slot: &str) -> Option<String> {
        m.store().unwrap().get(slot).unwrap()
    }

    fn mock_state() -> AppState {
        AppState::new(vec![Transaction {
            id: "1".to_string(),
            amount_cents: 1000,
            date: "2023-01-01".to_string(),
            kind: TransactionType::Expense,
            category: "Food".to_string(),
            note: String::new(),
            created_at: "2023-01-01T09:00:00.000Z".to_string(),
            updated_at: "2023-01-01T09:00:00.000Z".to_string(),
        }])
    }

    #[test]
    fn save_and_load_plaintext_state() {
        let m = manager();
        m.save(&mock_state(), None).unwrap();

        assert_eq!(m.load(None).unwrap(), Some(mock_state()));
        assert_eq!(m.status(None), VaultStatus::Disabled);
        assert!(!m.is_vault_enabled());
    }

    #[test]
    fn plaintext_ignores_supplied_key() {
        let m = manager();
        let key = crypto::derive_key("pw", b"salt", 1).unwrap();
        m.save(&mock_state(), Some(&key)).unwrap();

        let stored = raw(&m, APP_STATE_SLOT).unwrap();
        assert!(stored.contains("Food"));
        assert_eq!(m.load(Some(&key)).unwrap(), Some(mock_state()));
    }

    #[test]
    fn load_empty_store_returns_none() {
        assert_eq!(manager().load(None).unwrap(), None);
    }

    #[test]
    fn enable_then_unlock() {
        let m = manager();
        let key = m.enable("secure-password", &mock_state()).unwrap();

        let stored = raw(&m, APP_STATE_SLOT).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert!(parsed.get("kdf").is_some());
        assert!(parsed.get("cipher").is_some());
        assert_eq!(parsed["version"], 1);
        assert!(!stored.contains("Food"));

        assert_eq!(m.load(Some(&key)).unwrap(), Some(mock_state()));
        assert_eq!(m.load(None).unwrap(), None);

        let unlocked = m.unlock("secure-password").unwrap();
        assert_eq!(m.load(Some(&unlocked)).unwrap(), Some(mock_state()));

        assert!(matches!(
            m.unlock("wrong-password"),
            Err(VaultError::InvalidPassphrase)
        ));
    }

    #[test]
    fn status_follows_key_presence() {
        let m = manager();
        let key = m.enable("pw", &mock_state()).unwrap();
        assert_eq!(m.status(None), VaultStatus::Locked);
        assert_eq!(m.status(Some(&key)), VaultStatus::Unlocked);
    }

    #[test]
    fn enable_twice_is_rejected() {
        let m = manager();
        m.enable("first", &mock_state()).unwrap();
        let before = raw(&m, APP_STATE_SLOT);

        assert!(matches!(
            m.enable("second", &AppState::default()),
            Err(VaultError::AlreadyEnabled)
        ));
        assert_eq!(raw(&m, APP_STATE_SLOT), before);
    }

    #[test]
    fn enable_mints_fresh_salt_each_time() {
        let m = manager();
        let key = m.enable("pw", &mock_state()).unwrap();
        let first: VaultRecord = serde_json::from_str(&raw(&m, APP_STATE_SLOT).unwrap()).unwrap();

        m.disable(&key).unwrap();
        m.enable("pw", &mock_state()).unwrap();
        let second: VaultRecord = serde_json::from_str(&raw(&m, APP_STATE_SLOT).unwrap()).unwrap();

        assert_ne!(first.kdf.salt_b64, second.kdf.salt_b64);
        assert_eq!(second.kdf.iterations, TEST_ITERATIONS);
    }

    #[test]
    fn enable_removes_legacy_slot() {
        let m = manager();
        m.store()
            .unwrap()
            .set(LEGACY_TRANSACTIONS_SLOT, "[]")
            .unwrap();

        m.enable("pw", &mock_state()).unwrap();
        assert_eq!(raw(&m, LEGACY_TRANSACTIONS_SLOT), None);
    }

    #[test]
    fn save_with_vault_requires_key() {
        let m = manager();
        m.enable("pw", &mock_state()).unwrap();
        assert!(matches!(
            m.save(&AppState::default(), None),
            Err(VaultError::MissingKey)
        ));
    }

    #[test]
    fn save_with_vault_keeps_kdf_and_rotates_nonce() {
        let m = manager();
        let key = m.enable("pw", &mock_state()).unwrap();
        let before: VaultRecord = serde_json::from_str(&raw(&m, APP_STATE_SLOT).unwrap()).unwrap();

        m.save(&AppState::default(), Some(&key)).unwrap();
        let after: VaultRecord = serde_json::from_str(&raw(&m, APP_STATE_SLOT).unwrap()).unwrap();

        assert_eq!(after.version, before.version);
        assert_eq!(after.kdf, before.kdf);
        assert_ne!(after.cipher.iv_b64, before.cipher.iv_b64);
        assert_eq!(m.load(Some(&key)).unwrap(), Some(AppState::default()));

        // The same passphrase still unlocks after a save.
        let again = m.unlock("pw").unwrap();
        assert_eq!(m.load(Some(&again)).unwrap(), Some(AppState::default()));
    }

    #[test]
    fn save_with_stale_key_is_rejected() {
        let m = manager();
        m.enable("pw", &mock_state()).unwrap();
        let before = raw(&m, APP_STATE_SLOT);

        let stale = crypto::derive_key("pw", b"other salt", TEST_ITERATIONS).unwrap();
        assert!(matches!(
            m.save(&AppState::default(), Some(&stale)),
            Err(VaultError::DecryptionError)
        ));
        assert_eq!(raw(&m, APP_STATE_SLOT), before);
    }

    #[test]
    fn load_with_wrong_key_propagates_decryption_error() {
        let m = manager();
        m.enable("pw", &mock_state()).unwrap();
        let wrong = crypto::derive_key("nope", b"salt", TEST_ITERATIONS).unwrap();
        assert!(matches!(
            m.load(Some(&wrong)),
            Err(VaultError::DecryptionError)
        ));
    }

    #[test]
    fn disable_restores_plaintext() {
        let m = manager();
        let key = m.enable("pw", &mock_state()).unwrap();

        let recovered = m.disable(&key).unwrap();
        assert_eq!(recovered, mock_state());
        assert!(!m.is_vault_enabled());
        assert_eq!(m.load(None).unwrap(), Some(mock_state()));
        assert!(raw(&m, APP_STATE_SLOT).unwrap().contains("Food"));
    }

    #[test]
    fn disable_with_wrong_key_fails() {
        let m = manager();
        m.enable("pw", &mock_state()).unwrap();
        let wrong = crypto::derive_key("nope", b"salt", TEST_ITERATIONS).unwrap();

        assert!(matches!(m.disable(&wrong), Err(VaultError::DecryptionError)));
        assert!(m.is_vault_enabled());
    }

    #[test]
    fn disable_and_unlock_require_vault() {
        let m = manager();
        m.save(&mock_state(), None).unwrap();
        let key = crypto::derive_key("pw", b"salt", 1).unwrap();

        assert!(matches!(m.disable(&key), Err(VaultError::NotEnabled)));
        assert!(matches!(m.unlock("pw"), Err(VaultError::NotEnabled)));
    }

    #[test]
    fn legacy_slot_migrates_when_primary_is_empty() {
        let m = manager();
        let legacy = serde_json::to_string(&mock_state().transactions).unwrap();
        m.store()
            .unwrap()
            .set(LEGACY_TRANSACTIONS_SLOT, &legacy)
            .unwrap();

        assert_eq!(m.load(None).unwrap(), Some(mock_state()));
    }

    #[test]
    fn empty_legacy_slot_is_no_data() {
        let m = manager();
        m.store()
            .unwrap()
            .set(LEGACY_TRANSACTIONS_SLOT, "[]")
            .unwrap();
        assert_eq!(m.load(None).unwrap(), None);
    }

    #[test]
    fn plaintext_with_legacy_version_field_loads() {
        let m = manager();
        let blob = json!({"version": 0, "transactions": mock_state().transactions});
        m.store()
            .unwrap()
            .set(APP_STATE_SLOT, &blob.to_string())
            .unwrap();

        assert_eq!(m.load(None).unwrap(), Some(mock_state()));
    }

    #[test]
    fn corrupt_record_is_dropped_on_load() {
        let m = manager();
        let mut missing_id = serde_json::to_value(&mock_state().transactions[0]).unwrap();
        missing_id.as_object_mut().unwrap().remove("id");
        let blob = json!({"transactions": [missing_id, mock_state().transactions[0]]});
        m.store()
            .unwrap()
            .set(APP_STATE_SLOT, &blob.to_string())
            .unwrap();

        assert_eq!(m.load(None).unwrap(), Some(mock_state()));
    }

    #[test]
    fn unparseable_primary_slot_loads_as_none() {
        let m = manager();
        m.store().unwrap().set(APP_STATE_SLOT, "{not json").unwrap();
        assert_eq!(m.load(None).unwrap(), None);
        assert!(!m.is_vault_enabled());
    }

    fn corrupt_vault(m: &VaultManager<MemorySlotStore>) -> (SessionKey, String) {
        let key = m.enable("pw", &mock_state()).unwrap();
        let mut value: serde_json::Value =
            serde_json::from_str(&raw(m, APP_STATE_SLOT).unwrap()).unwrap();
        value["kdf"].as_object_mut().unwrap().remove("iterations");
        let text = value.to_string();
        m.store().unwrap().set(APP_STATE_SLOT, &text).unwrap();
        (key, text)
    }

    #[test]
    fn malformed_vault_record_still_counts_as_enabled() {
        let m = manager();
        let (key, _) = corrupt_vault(&m);

        assert!(m.is_vault_enabled());
        assert_eq!(m.status(None), VaultStatus::Locked);
        assert_eq!(m.load(None).unwrap(), None);
        assert!(matches!(
            m.load(Some(&key)),
            Err(VaultError::InvalidFormat(_))
        ));
    }

    #[test]
    fn malformed_vault_record_is_never_overwritten() {
        let m = manager();
        let (key, text) = corrupt_vault(&m);

        assert!(matches!(
            m.save(&AppState::default(), None),
            Err(VaultError::MissingKey)
        ));
        assert!(matches!(
            m.save(&AppState::default(), Some(&key)),
            Err(VaultError::DecryptionError)
        ));
        assert!(matches!(
            m.enable("other", &AppState::default()),
            Err(VaultError::AlreadyEnabled)
        ));
        assert_eq!(raw(&m, APP_STATE_SLOT).as_deref(), Some(text.as_str()));
    }

    #[test]
    fn malformed_vault_record_fails_unlock_and_disable() {
        let m = manager();
        let (key, text) = corrupt_vault(&m);

        assert!(matches!(m.unlock("pw"), Err(VaultError::InvalidFormat(_))));
        assert!(matches!(m.disable(&key), Err(VaultError::InvalidFormat(_))));
        assert!(matches!(m.import_raw(&text), Err(VaultError::InvalidFormat(_))));
        assert_eq!(raw(&m, APP_STATE_SLOT).as_deref(), Some(text.as_str()));
    }

    #[test]
    fn enable_uses_configured_iterations() {
        let m = manager();
        assert_eq!(m.iterations(), TEST_ITERATIONS);
        assert_eq!(
            VaultManager::<MemorySlotStore>::detached().iterations(),
            DEFAULT_ITERATIONS
        );

        m.enable("pw", &mock_state()).unwrap();
        let record: VaultRecord = serde_json::from_str(&raw(&m, APP_STATE_SLOT).unwrap()).unwrap();
        assert_eq!(record.kdf.iterations, m.iterations());
    }

    #[test]
    fn export_returns_verbatim_text() {
        let m = manager();
        assert_eq!(m.export_raw().unwrap(), None);

        m.enable("pw", &mock_state()).unwrap();
        assert_eq!(m.export_raw().unwrap(), raw(&m, APP_STATE_SLOT));
    }

    #[test]
    fn import_roundtrip_restores_vault() {
        let source = manager();
        source.enable("pw", &mock_state()).unwrap();
        let exported = source.export_raw().unwrap().unwrap();

        let target = manager();
        target.save(&AppState::default(), None).unwrap();
        target.import_raw(&exported).unwrap();

        assert_eq!(raw(&target, APP_STATE_SLOT).as_deref(), Some(exported.as_str()));
        let key = target.unlock("pw").unwrap();
        assert_eq!(target.load(Some(&key)).unwrap(), Some(mock_state()));
    }

    #[test]
    fn invalid_import_is_rejected_and_slot_untouched() {
        let m = manager();
        m.save(&mock_state(), None).unwrap();
        let before = raw(&m, APP_STATE_SLOT);

        for bad in [
            r#"{"foo":1}"#,
            "not json",
            r#"{"transactions":[]}"#,
            r#"{"version":1,"kdf":{"saltB64":"AAAA"},"cipher":{"ivB64":"","ciphertextB64":""}}"#,
        ] {
            assert!(
                matches!(m.import_raw(bad), Err(VaultError::InvalidFormat(_))),
                "accepted {bad}"
            );
        }
        assert_eq!(raw(&m, APP_STATE_SLOT), before);
    }

    #[test]
    fn import_requires_version() {
        let source = manager();
        source.enable("pw", &mock_state()).unwrap();
        let mut value: serde_json::Value =
            serde_json::from_str(&source.export_raw().unwrap().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("version");

        assert!(matches!(
            manager().import_raw(&value.to_string()),
            Err(VaultError::InvalidFormat(_))
        ));
    }

    #[test]
    fn reset_erases_both_slots() {
        let m = manager();
        m.enable("pw", &mock_state()).unwrap();
        m.store()
            .unwrap()
            .set(LEGACY_TRANSACTIONS_SLOT, "[]")
            .unwrap();

        m.reset().unwrap();
        assert!(m.store().unwrap().is_empty());
        assert!(!m.is_vault_enabled());
        assert_eq!(m.load(None).unwrap(), None);
    }

    #[test]
    fn writes_emit_change_notifications() {
        let m = manager();
        let mut rx = m.subscribe();

        m.save(&mock_state(), None).unwrap();
        let key = m.enable("pw", &mock_state()).unwrap();
        m.disable(&key).unwrap();
        m.reset().unwrap();

        assert_eq!(rx.try_recv().unwrap(), StorageChange::Saved);
        assert_eq!(rx.try_recv().unwrap(), StorageChange::VaultEnabled);
        assert_eq!(rx.try_recv().unwrap(), StorageChange::VaultDisabled);
        assert_eq!(rx.try_recv().unwrap(), StorageChange::Reset);
    }

    #[test]
    fn failed_writes_do_not_notify() {
        let m = manager();
        let mut rx = m.subscribe();
        assert!(m.import_raw(r#"{"foo":1}"#).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn detached_manager_degrades_to_noop() {
        let m: VaultManager<MemorySlotStore> =
            VaultManager::detached().with_iterations(TEST_ITERATIONS);

        assert_eq!(m.load(None).unwrap(), None);
        m.save(&mock_state(), None).unwrap();
        assert_eq!(m.load(None).unwrap(), None);
        assert!(!m.is_vault_enabled());
        assert_eq!(m.export_raw().unwrap(), None);
        m.reset().unwrap();

        let key = m.enable("pw", &mock_state()).unwrap();
        assert!(!m.is_vault_enabled());
        assert!(matches!(m.unlock("pw"), Err(VaultError::NotEnabled)));
        drop(key);
    }
}
