// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Binary to text transcoding for values kept in the string-only slot store.
//!
//! Standard padded base64, constant-time via `base64ct`.

use base64ct::{Base64, Encoding};

use crate::error::{VaultError, VaultResult};

/// Encode bytes as standard base64.
pub fn bytes_to_text(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode standard base64 back into bytes.
pub fn text_to_bytes(text: &str) -> VaultResult<Vec<u8>> {
    Base64::decode_vec(text).map_err(|e| VaultError::InvalidFormat(format!("bad base64: {e}")))
}
