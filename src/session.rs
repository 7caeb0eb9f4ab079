// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller-owned vault session.
//!
//! A [`VaultSession`] holds what the manager deliberately does not: the live
//! session key and the decrypted ledger. Dropping the session (or calling
//! [`VaultSession::lock`]) zeroizes the key.
//!
//! KDF and cipher work runs on the blocking pool so async callers are never
//! stalled by PBKDF2.

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::SessionKey;
use crate::error::{VaultError, VaultResult};
use crate::models::{AppState, NewTransaction, Transaction, TransactionPatch};
use crate::storage::SlotStore;
use crate::transactions;
use crate::vault::{VaultManager, VaultStatus};

pub struct VaultSession<S> {
    manager: Arc<VaultManager<S>>,
    key: Option<SessionKey>,
    state: Option<AppState>,
    vault_enabled: bool,
}

impl<S: SlotStore + 'static> VaultSession<S> {
    /// Open a session. A plaintext ledger is loaded immediately; a vault
    /// starts locked.
    pub async fn open(manager: Arc<VaultManager<S>>) -> VaultResult<Self> {
        let mut session = Self {
            manager,
            key: None,
            state: None,
            vault_enabled: false,
        };
        session.reload().await?;
        Ok(session)
    }

    async fn blocking<T, F>(&self, f: F) -> VaultResult<T>
    where
        F: FnOnce(&VaultManager<S>) -> VaultResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || f(manager.as_ref()))
            .await
            .map_err(|e| VaultError::Task(e.to_string()))?
    }

    pub fn manager(&self) -> &Arc<VaultManager<S>> {
        &self.manager
    }

    pub fn status(&self) -> VaultStatus {
        match (self.vault_enabled, &self.key) {
            (false, _) => VaultStatus::Disabled,
            (true, None) => VaultStatus::Locked,
            (true, Some(_)) => VaultStatus::Unlocked,
        }
    }

    pub fn is_vault_enabled(&self) -> bool {
        self.vault_enabled
    }

    pub fn is_locked(&self) -> bool {
        self.vault_enabled && self.key.is_none()
    }

    /// The decrypted ledger, `None` while locked.
    pub fn state(&self) -> Option<&AppState> {
        self.state.as_ref()
    }

    /// Look up a transaction by id in the loaded ledger.
    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.state
            .as_ref()
            .and_then(|state| transactions::find(&state.transactions, id))
    }

    fn unlocked_state(&self) -> VaultResult<&AppState> {
        if self.is_locked() {
            return Err(VaultError::VaultLocked);
        }
        self.state.as_ref().ok_or(VaultError::VaultLocked)
    }

    // ========== Lifecycle ==========

    /// Re-read status and ledger from storage.
    ///
    /// If the vault went away underneath the session the key is dropped.
    pub async fn reload(&mut self) -> VaultResult<()> {
        let key = self.key.clone();
        let (enabled, state) = self
            .blocking(move |manager| {
                let enabled = manager.is_vault_enabled();
                if enabled && key.is_none() {
                    return Ok((enabled, None));
                }
                let state = manager.load(key.as_ref())?.unwrap_or_default();
                Ok((enabled, Some(state)))
            })
            .await?;

        self.vault_enabled = enabled;
        if !enabled {
            self.key = None;
        }
        self.state = state;
        Ok(())
    }

    /// Try a passphrase. Returns `false` when it is wrong.
    pub async fn unlock(&mut self, passphrase: &str) -> VaultResult<bool> {
        let passphrase = Zeroizing::new(passphrase.to_string());
        let result = self
            .blocking(move |manager| {
                let key = manager.unlock(&passphrase)?;
                let state = manager.load(Some(&key))?.unwrap_or_default();
                Ok((key, state))
            })
            .await;

        match result {
            Ok((key, state)) => {
                self.key = Some(key);
                self.state = Some(state);
                self.vault_enabled = true;
                Ok(true)
            }
            Err(VaultError::InvalidPassphrase) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Forget the key and the decrypted ledger. Storage is not touched.
    pub fn lock(&mut self) {
        if self.key.take().is_some() {
            tracing::info!("Vault locked");
        }
        if self.vault_enabled {
            self.state = None;
        }
    }

    /// Encrypt the current ledger under `passphrase` and keep the session
    /// unlocked.
    pub async fn enable(&mut self, passphrase: &str) -> VaultResult<()> {
        if self.vault_enabled {
            return Err(VaultError::AlreadyEnabled);
        }
        let state = self.state.clone().unwrap_or_default();
        let passphrase = Zeroizing::new(passphrase.to_string());

        let sealed = state.clone();
        let key = self
            .blocking(move |manager| manager.enable(&passphrase, &sealed))
            .await?;

        self.key = Some(key);
        self.state = Some(state);
        self.vault_enabled = true;
        Ok(())
    }

    /// Decrypt the ledger back to plaintext storage. Requires an unlocked
    /// session.
    pub async fn disable(&mut self) -> VaultResult<()> {
        if !self.vault_enabled {
            return Err(VaultError::NotEnabled);
        }
        let key = self.key.clone().ok_or(VaultError::VaultLocked)?;
        let state = self.blocking(move |manager| manager.disable(&key)).await?;

        self.key = None;
        self.vault_enabled = false;
        self.state = Some(state);
        Ok(())
    }

    /// Persist a whole new ledger.
    pub async fn update_state(&mut self, state: AppState) -> VaultResult<()> {
        if self.is_locked() {
            return Err(VaultError::VaultLocked);
        }
        let key = self.key.clone();
        let saved = state.clone();
        self.blocking(move |manager| manager.save(&saved, key.as_ref()))
            .await?;

        self.state = Some(state);
        Ok(())
    }

    // ========== Transactions ==========

    pub async fn add_transaction(&mut self, input: NewTransaction) -> VaultResult<Transaction> {
        let state = self.unlocked_state()?;
        let (created, list) = transactions::add(&state.transactions, input)?;
        self.update_state(AppState::new(list)).await?;
        Ok(created)
    }

    /// Returns `None` for an unknown id, in which case nothing is written.
    pub async fn update_transaction(
        &mut self,
        id: &str,
        patch: TransactionPatch,
    ) -> VaultResult<Option<Transaction>> {
        let state = self.unlocked_state()?;
        let (updated, list) = transactions::update(&state.transactions, id, patch)?;
        if updated.is_some() {
            self.update_state(AppState::new(list)).await?;
        }
        Ok(updated)
    }

    pub async fn remove_transaction(&mut self, id: &str) -> VaultResult<bool> {
        let state = self.unlocked_state()?;
        let (removed, list) = transactions::remove(&state.transactions, id);
        if removed {
            self.update_state(AppState::new(list)).await?;
        }
        Ok(removed)
    }

    // ========== Backup ==========

    pub async fn export_raw(&self) -> VaultResult<Option<String>> {
        self.blocking(|manager| manager.export_raw()).await
    }

    /// Replace storage with an exported vault record. The session ends up
    /// locked against the imported record.
    pub async fn import_raw(&mut self, text: &str) -> VaultResult<()> {
        let text = text.to_string();
        self.blocking(move |manager| manager.import_raw(&text))
            .await?;

        self.key = None;
        self.state = None;
        self.reload().await
    }

    /// Erase everything. The session returns to an empty plaintext ledger.
    pub async fn reset(&mut self) -> VaultResult<()> {
        self.blocking(|manager| manager.reset()).await?;

        self.key = None;
        self.vault_enabled = false;
        self.state = Some(AppState::default());
        Ok(())
    }
}

impl<S> std::fmt::Debug for VaultSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("vault_enabled", &self.vault_enabled)
            .field("unlocked", &self.key.is_some())
            .field(
                "transactions",
                &self.state.as_ref().map(|s| s.transactions.len()),
            )
            .finish()
    }
}
