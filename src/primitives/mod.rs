// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Wrappers over the low-level primitives, resolved from a [Configuration]
//! and carrying the derived sizes the protocol core needs

pub(crate) mod expand;
pub(crate) mod group;
pub(crate) mod hash;
pub(crate) mod kdf;
pub(crate) mod mac;
pub(crate) mod mhf;

use crate::config::{Configuration, Group, Hash, Kdf, Mac, Mhf, Mode};
use crate::errors::ProtocolError;

/// The validated, resolved primitive set. Constructed once per handle; all
/// protocol code consumes primitives through this.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Parameters {
    pub(crate) oprf_group: Group,
    pub(crate) kdf: Kdf,
    pub(crate) mac: Mac,
    pub(crate) hash: Hash,
    pub(crate) mhf: Mhf,
    pub(crate) mode: Mode,
    pub(crate) ake_group: Group,
    pub(crate) nonce_len: usize,
}

impl Parameters {
    pub(crate) fn new(config: &Configuration) -> Result<Self, ProtocolError> {
        if config.nonce_len == 0 || config.nonce_len > u8::MAX as usize {
            return Err(ProtocolError::InvalidConfiguration);
        }

        Ok(Self {
            oprf_group: config.oprf_group,
            kdf: config.kdf,
            mac: config.mac,
            hash: config.hash,
            mhf: config.mhf,
            mode: config.mode,
            ake_group: config.ake_group,
            nonce_len: config.nonce_len,
        })
    }

    /// The envelope's on-wire size, deterministic from the configuration.
    pub(crate) fn envelope_size(&self) -> usize {
        match self.mode {
            Mode::Internal => self.nonce_len + self.mac.size(),
            Mode::External => self.nonce_len + self.ake_group.scalar_len() + self.mac.size(),
        }
    }

    /// The size of the masked portion of the credential response.
    pub(crate) fn masked_response_size(&self) -> usize {
        self.ake_group.element_len() + self.envelope_size()
    }
}
