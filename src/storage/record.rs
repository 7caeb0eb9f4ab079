// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The record persisted in the primary slot.
//!
//! A slot holds either a plaintext `AppState` or a vault record:
//!
//! ```text
//! {"transactions":[...]}
//! {"version":1,"kdf":{"saltB64":"..","iterations":100000},
//!  "cipher":{"ivB64":"..","ciphertextB64":".."}}
//! ```
//!
//! The variant is decided once, in [`StorageRecord::parse`]: an object with
//! both a `kdf` object and a `cipher` object is a vault record, anything else
//! is plaintext. A vault-shaped object whose fields do not decode is kept as
//! [`StorageRecord::CorruptVault`] so it is never mistaken for plaintext.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{SlotStore, StorageResult, LEGACY_TRANSACTIONS_SLOT};
use crate::crypto::{self, CipherEnvelope, KdfParams, SessionKey, NONCE_SIZE};
use crate::encoding::{bytes_to_text, text_to_bytes};
use crate::error::{VaultError, VaultResult};
use crate::models::{AppState, Transaction};
use crate::transactions::coerce_list;

/// Current vault record format version.
pub const VAULT_RECORD_VERSION: u32 = 1;

/// Persisted key derivation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfRecord {
    pub salt_b64: String,
    pub iterations: u32,
}

/// Persisted cipher envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherRecord {
    pub iv_b64: String,
    pub ciphertext_b64: String,
}

/// Encrypted form of an `AppState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Missing on hand-edited records; `validate` rejects zero.
    #[serde(default)]
    pub version: u32,
    pub kdf: KdfRecord,
    pub cipher: CipherRecord,
}

impl VaultRecord {
    /// Encrypt `state` into a new record with the given KDF parameters.
    pub fn seal(state: &AppState, kdf: &KdfParams, key: &SessionKey) -> VaultResult<Self> {
        let kdf = KdfRecord {
            salt_b64: bytes_to_text(&kdf.salt),
            iterations: kdf.iterations,
        };
        Self::seal_with(VAULT_RECORD_VERSION, kdf, state, key)
    }

    /// Re-encrypt `state` keeping this record's version and KDF parameters.
    /// Only the nonce and ciphertext change.
    pub fn reseal(&self, state: &AppState, key: &SessionKey) -> VaultResult<Self> {
        Self::seal_with(self.version, self.kdf.clone(), state, key)
    }

    fn seal_with(
        version: u32,
        kdf: KdfRecord,
        state: &AppState,
        key: &SessionKey,
    ) -> VaultResult<Self> {
        let plaintext = serde_json::to_vec(state)?;
        let envelope = crypto::encrypt(&plaintext, key)?;

        Ok(Self {
            version,
            kdf,
            cipher: CipherRecord {
                iv_b64: bytes_to_text(&envelope.nonce),
                ciphertext_b64: bytes_to_text(&envelope.ciphertext),
            },
        })
    }

    /// Decode the KDF parameters needed to re-derive the key.
    pub fn kdf_params(&self) -> VaultResult<KdfParams> {
        Ok(KdfParams {
            salt: text_to_bytes(&self.kdf.salt_b64)?,
            iterations: self.kdf.iterations,
        })
    }

    /// Decode the cipher envelope. A malformed envelope cannot be decrypted.
    pub fn envelope(&self) -> VaultResult<CipherEnvelope> {
        let nonce = text_to_bytes(&self.cipher.iv_b64).map_err(|_| VaultError::DecryptionError)?;
        let ciphertext =
            text_to_bytes(&self.cipher.ciphertext_b64).map_err(|_| VaultError::DecryptionError)?;
        Ok(CipherEnvelope { nonce, ciphertext })
    }

    /// Decrypt and parse the sealed state.
    pub fn open(&self, key: &SessionKey) -> VaultResult<AppState> {
        let plaintext = crypto::decrypt(&self.envelope()?, key)?;
        let value: Value = serde_json::from_slice(&plaintext)?;
        Ok(app_state_from_value(&value))
    }

    /// Check that every field decodes, without decrypting.
    pub fn validate(&self) -> VaultResult<()> {
        if self.version == 0 {
            return Err(VaultError::InvalidFormat("missing version".to_string()));
        }
        if self.kdf.iterations == 0 {
            return Err(VaultError::InvalidFormat(
                "kdf iterations must be positive".to_string(),
            ));
        }
        if text_to_bytes(&self.kdf.salt_b64)?.is_empty() {
            return Err(VaultError::InvalidFormat("empty kdf salt".to_string()));
        }
        if text_to_bytes(&self.cipher.iv_b64)?.len() != NONCE_SIZE {
            return Err(VaultError::InvalidFormat(format!(
                "cipher iv must be {NONCE_SIZE} bytes"
            )));
        }
        text_to_bytes(&self.cipher.ciphertext_b64)?;
        Ok(())
    }
}

/// Tagged content of the primary slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRecord {
    Plain(AppState),
    Vault(VaultRecord),
    /// Has the `kdf` and `cipher` objects of a vault record but malformed
    /// fields. Carries the decode error.
    CorruptVault(String),
}

impl StorageRecord {
    /// Parse slot text, deciding the variant once.
    pub fn parse(text: &str) -> VaultResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| VaultError::InvalidFormat(format!("not JSON: {e}")))?;

        let Some(obj) = value.as_object() else {
            return Err(VaultError::InvalidFormat(
                "record is not a JSON object".to_string(),
            ));
        };

        let is_vault = obj.get("kdf").is_some_and(Value::is_object)
            && obj.get("cipher").is_some_and(Value::is_object);

        if is_vault {
            match serde_json::from_value::<VaultRecord>(value) {
                Ok(record) => Ok(StorageRecord::Vault(record)),
                Err(e) => Ok(StorageRecord::CorruptVault(e.to_string())),
            }
        } else {
            Ok(StorageRecord::Plain(app_state_from_value(&value)))
        }
    }

    /// True for vault records, including corrupt ones.
    pub fn is_vault(&self) -> bool {
        matches!(
            self,
            StorageRecord::Vault(_) | StorageRecord::CorruptVault(_)
        )
    }

    /// Serialize for the slot store.
    pub fn to_json(&self) -> VaultResult<String> {
        Ok(match self {
            StorageRecord::Plain(state) => serde_json::to_string(state)?,
            StorageRecord::Vault(record) => serde_json::to_string(record)?,
            StorageRecord::CorruptVault(reason) => {
                return Err(VaultError::InvalidFormat(reason.clone()))
            }
        })
    }
}

/// Build an `AppState` from a JSON object, coercing each transaction.
///
/// Unknown top-level fields (such as a stray `version`) are dropped; a missing
/// or non-array `transactions` field yields an empty state.
pub fn app_state_from_value(value: &Value) -> AppState {
    let transactions = value
        .get("transactions")
        .and_then(Value::as_array)
        .map(|items| coerce_list(items))
        .unwrap_or_default();
    AppState::new(transactions)
}

/// Read the legacy bare-list slot.
///
/// Absent slot, invalid JSON or a non-array value all yield an empty list.
pub fn read_legacy_transactions(store: &dyn SlotStore) -> StorageResult<Vec<Transaction>> {
    let Some(raw) = store.get(LEGACY_TRANSACTIONS_SLOT)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => Ok(coerce_list(&items)),
        Ok(_) => {
            tracing::warn!("Legacy transactions slot is not a list, ignoring");
            Ok(Vec::new())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Legacy transactions slot is not valid JSON, ignoring");
            Ok(Vec::new())
        }
    }
}
