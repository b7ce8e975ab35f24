// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The key derivation function consumed by the protocol core

use hkdf::Hkdf;
use sha2::{Sha256, Sha512};

use crate::config::Kdf;
use crate::errors::ProtocolError;

impl Kdf {
    /// The output size of the underlying hash, in bytes
    pub(crate) fn size(&self) -> usize {
        match self {
            Kdf::HkdfSha256 => 32,
            Kdf::HkdfSha512 => 64,
        }
    }

    /// HKDF-Extract: derives a pseudorandom key from input keying material.
    pub(crate) fn extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
        let salt = if salt.is_empty() { None } else { Some(salt) };
        match self {
            Kdf::HkdfSha256 => Hkdf::<Sha256>::extract(salt, ikm).0.to_vec(),
            Kdf::HkdfSha512 => Hkdf::<Sha512>::extract(salt, ikm).0.to_vec(),
        }
    }

    /// HKDF-Expand: expands a pseudorandom key into `len` output bytes
    /// bound to `info`.
    pub(crate) fn expand(
        &self,
        prk: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut okm = vec![0u8; len];
        match self {
            Kdf::HkdfSha256 => Hkdf::<Sha256>::from_prk(prk)
                .map_err(|_| ProtocolError::InvalidConfiguration)?
                .expand(info, &mut okm)
                .map_err(|_| ProtocolError::InvalidConfiguration)?,
            Kdf::HkdfSha512 => Hkdf::<Sha512>::from_prk(prk)
                .map_err(|_| ProtocolError::InvalidConfiguration)?
                .expand(info, &mut okm)
                .map_err(|_| ProtocolError::InvalidConfiguration)?,
        }
        Ok(okm)
    }
}
