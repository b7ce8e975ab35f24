// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The message authentication function consumed by the protocol core

use hmac::{Hmac, Mac as _};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::config::Mac;
use crate::errors::ProtocolError;

impl Mac {
    /// The tag size, in bytes
    pub(crate) fn size(&self) -> usize {
        match self {
            Mac::HmacSha256 => 32,
            Mac::HmacSha512 => 64,
        }
    }

    /// Computes the authentication tag of `msg` under `key`.
    pub(crate) fn mac(&self, key: &[u8], msg: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Mac::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|_| ProtocolError::InvalidConfiguration)?;
                mac.update(msg);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            Mac::HmacSha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)
                    .map_err(|_| ProtocolError::InvalidConfiguration)?;
                mac.update(msg);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }

    /// Verifies an authentication tag in constant time. Every failure maps
    /// to the single credentials error.
    pub(crate) fn verify(&self, key: &[u8], msg: &[u8], tag: &[u8]) -> Result<(), ProtocolError> {
        let expected = self.mac(key, msg)?;
        if bool::from(expected.ct_eq(tag)) {
            Ok(())
        } else {
            Err(ProtocolError::InvalidCredentials)
        }
    }
}
